//! Bearer-token extraction (§4.9, §6): a small `FromRequestParts` impl shared
//! by every handler that requires authentication, implemented against the
//! agent store's hashed-API-key lookup. Missing header, malformed prefix, and
//! unknown/inactive key all collapse to the same 401 the transport contract
//! requires.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use reaper_core::{Agent, ReaperError};

use crate::error::ApiError;
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// The agent that authenticated this request, resolved from its API key.
pub struct AuthenticatedAgent(pub Agent);

impl FromRequestParts<Arc<AppState>> for AuthenticatedAgent {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or_else(|| ApiError(ReaperError::Unauthorized { reason: "missing Authorization header".into() }))?;
        let value = header
            .to_str()
            .map_err(|_| ApiError(ReaperError::Unauthorized { reason: "malformed Authorization header".into() }))?;
        let key = value
            .strip_prefix(BEARER_PREFIX)
            .ok_or_else(|| ApiError(ReaperError::Unauthorized { reason: "malformed Authorization header".into() }))?;

        let agent = state
            .agents
            .find_by_api_key(key)
            .await
            .map_err(|_| ApiError(ReaperError::Unauthorized { reason: "unknown API key".into() }))?;
        if !agent.is_active() {
            return Err(ApiError(ReaperError::Unauthorized { reason: "agent is inactive".into() }));
        }
        Ok(AuthenticatedAgent(agent))
    }
}

impl AuthenticatedAgent {
    /// §6 "self-only": the authenticated agent must match the path's agent ID.
    pub fn require_self(&self, path_agent_id: &str) -> Result<(), ApiError> {
        if self.0.id != path_agent_id {
            return Err(ApiError(ReaperError::Forbidden {
                reason: "operation is restricted to the agent's own identity".into(),
            }));
        }
        Ok(())
    }

    /// §6 "owner-only": the authenticated agent must own the resource.
    pub fn require_owner(&self, owner_agent_id: &str) -> Result<(), ApiError> {
        if self.0.id != owner_agent_id {
            return Err(ApiError(ReaperError::Forbidden { reason: "not the owner of this resource".into() }));
        }
        Ok(())
    }
}
