//! Thin Axum handlers for the enforcement sidecar (§4.9). `send_message` is
//! the only business endpoint: it resolves a mandate by calling back to
//! `reaper-platform`, then runs the pure engine's authorize phase against a
//! state snapshot. It never runs the caller's side-effecting code — that
//! only happens for an in-process embed using `TwoPhaseExecutor::execute`
//! directly.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use policy_engine::authorize;
use reaper_core::{
    Action, ActionKind, ActionType, AuditDecision, AuditEntry, AuditSink, Decision, Mandate, ReaperError, VERSION,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub type AppResult<T> = Result<T, ApiError>;

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn metrics() -> Json<Value> {
    Json(json!({ "service": "reaper-agent", "version": VERSION }))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub mandate_id: String,
    pub action: Action,
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mandate = fetch_mandate(&state, &headers, &body.mandate_id).await?;

    let now = Utc::now();
    let runtime_state = state.state_manager.get(&mandate.agent_id, &mandate.id).await;
    let decision = authorize(&body.action, &mandate, &runtime_state, now);

    record_decision(&state, &mandate, &body.action, &decision, now).await?;

    match &decision {
        Decision::Allow { .. } => Ok((StatusCode::OK, Json(json!(decision)))),
        Decision::Block { .. } => Ok((StatusCode::FORBIDDEN, Json(json!(decision)))),
    }
}

async fn fetch_mandate(state: &AppState, headers: &HeaderMap, mandate_id: &str) -> Result<Mandate, ApiError> {
    let mut request = state.http.get(format!("{}/mandates/{mandate_id}", state.config.platform_url));
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION) {
        request = request.header(axum::http::header::AUTHORIZATION, auth);
    }

    let response = request.send().await.map_err(|err| {
        ApiError(ReaperError::AgentCommunicationError { reason: err.to_string() })
    })?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError(ReaperError::MandateNotFound { mandate_id: mandate_id.to_string() }));
    }
    if !response.status().is_success() {
        return Err(ApiError(ReaperError::AgentCommunicationError {
            reason: format!("platform returned {}", response.status()),
        }));
    }

    response
        .json::<Mandate>()
        .await
        .map_err(|err| ApiError(ReaperError::AgentCommunicationError { reason: err.to_string() }))
}

async fn record_decision(
    state: &AppState,
    mandate: &Mandate,
    action: &Action,
    decision: &Decision,
    now: chrono::DateTime<Utc>,
) -> Result<(), ApiError> {
    let (audit_decision, reason, block_code) = match decision {
        Decision::Allow { reason, .. } => (AuditDecision::Allow, reason.clone(), None),
        Decision::Block { reason, code } => (AuditDecision::Block, reason.clone(), Some(*code)),
    };
    let action_type = match &action.kind {
        ActionKind::ToolCall { .. } => ActionType::ToolCall,
        ActionKind::LlmCall => ActionType::LlmCall,
    };
    let entry = AuditEntry {
        agent_id: mandate.agent_id.clone(),
        action_id: action.id.clone(),
        timestamp: now,
        action_type,
        tool_name: action.tool_name().map(str::to_string),
        mandate_id: Some(mandate.id.clone()),
        decision: audit_decision,
        reason,
        block_code,
        estimated_cost: Some(action.estimated_cost),
        actual_cost: None,
        cumulative_cost: None,
        context: Some(mandate.context.clone()),
        matched_rules: mandate.matched_rules.clone(),
        applied_policies: mandate.applied_policies.clone(),
        metadata: json!({}),
    };
    state.audit.append(entry).await?;
    Ok(())
}
