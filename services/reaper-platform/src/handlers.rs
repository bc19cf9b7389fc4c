//! Thin Axum handlers (§4.9): each extracts/validates the HTTP-level shape,
//! calls exactly one core operation, and maps the result to a JSON body and
//! status code per §6/§7. No business logic lives here — condition matching,
//! composition, and versioning all belong to the crates this binary wires up.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use reaper_core::{
    AgentStore, AgentUpdate, AuditDecision, AuditEntry, AuditQuery, AuditSink, Context,
    KillRegistry, MandateStore, NewAgent, NewPolicy, NewRule, PolicyStore, PolicyUpdate,
    ReaperError, RuleStore, RuleUpdate, VERSION,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthenticatedAgent;
use crate::error::ApiError;
use crate::state::AppState;

pub type AppResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------- health ---

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "details": {
            "database": {
                "status": "healthy",
                "pool": { "total": 1, "idle": 1, "waiting": 0 },
                "maxConnections": 1
            }
        }
    }))
}

pub async fn metrics() -> Json<Value> {
    Json(json!({ "service": "reaper-platform", "version": VERSION }))
}

// --------------------------------------------------------------- agents ---

pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    Json(new_agent): Json<NewAgent>,
) -> AppResult<Json<Value>> {
    let (agent, api_key) = state.agents.create(new_agent).await?;
    Ok(Json(json!({ "agent": agent, "apiKey": api_key })))
}

pub async fn list_agents(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let agents = state.agents.list().await?;
    Ok(Json(json!({ "total": agents.len(), "agents": agents })))
}

pub async fn get_agent(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    Ok(Json(json!(state.agents.get(&id).await?)))
}

pub async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<AgentUpdate>,
) -> AppResult<Json<Value>> {
    Ok(Json(json!(state.agents.update(&id, update).await?)))
}

pub async fn delete_agent(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    Ok(Json(json!(state.agents.soft_delete(&id).await?)))
}

#[derive(Deserialize)]
pub struct KillRequest {
    pub reason: String,
}

pub async fn kill_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    agent: AuthenticatedAgent,
    Json(body): Json<KillRequest>,
) -> AppResult<Json<Value>> {
    agent.require_self(&id)?;
    let entry = state.kill_registry.kill(&id, body.reason, agent.0.id.clone()).await?;
    Ok(Json(json!(entry)))
}

pub async fn kill_status(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Json<Value> {
    let status: reaper_core::KillStatus = state.kill_registry.status(&id).await.into();
    Json(json!(status))
}

pub async fn resurrect_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    agent: AuthenticatedAgent,
) -> AppResult<Json<Value>> {
    agent.require_self(&id)?;
    state.kill_registry.resurrect(&id).await?;
    Ok(Json(json!(state.agents.get(&id).await?)))
}

// -------------------------------------------------------------- policies ---

pub async fn create_policy(
    State(state): State<Arc<AppState>>,
    Json(new_policy): Json<NewPolicy>,
) -> AppResult<Json<Value>> {
    Ok(Json(json!(state.policies.insert_new(new_policy).await?)))
}

#[derive(Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub active: Option<bool>,
}

pub async fn list_policies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let policies =
        if q.active.unwrap_or(false) { state.policies.list_active().await? } else { state.policies.list_all().await? };
    Ok(Json(json!({ "total": policies.len(), "policies": policies })))
}

#[derive(Deserialize, Default)]
pub struct VersionQuery {
    pub version: Option<u64>,
}

pub async fn get_policy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<VersionQuery>,
) -> AppResult<Json<Value>> {
    let policy = match q.version {
        Some(v) => state.policies.get_version(&id, v).await?,
        None => state.policies.get_latest_active(&id).await?,
    };
    Ok(Json(json!(policy)))
}

pub async fn update_policy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<PolicyUpdate>,
) -> AppResult<Json<Value>> {
    Ok(Json(json!(state.policies.update(&id, update).await?)))
}

pub async fn delete_policy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<VersionQuery>,
) -> AppResult<Json<Value>> {
    state.policies.delete(&id, q.version).await?;
    Ok(Json(json!({ "policyId": id, "version": q.version, "status": "deleted" })))
}

// ----------------------------------------------------------------- rules ---

pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(new_rule): Json<NewRule>,
) -> AppResult<Json<Value>> {
    Ok(Json(json!(state.rules.insert_new(new_rule).await?)))
}

pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let rules = if q.active.unwrap_or(false) { state.rules.list_active().await? } else { state.rules.list_all().await? };
    Ok(Json(json!({ "total": rules.len(), "rules": rules })))
}

pub async fn get_rule(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    Ok(Json(json!(state.rules.get_latest(&id).await?)))
}

pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<RuleUpdate>,
) -> AppResult<Json<Value>> {
    Ok(Json(json!(state.rules.update(&id, update).await?)))
}

pub async fn delete_rule(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    state.rules.delete(&id).await?;
    Ok(Json(json!({ "ruleId": id, "status": "deleted" })))
}

// -------------------------------------------------------------- mandates ---

#[derive(Deserialize)]
pub struct IssueMandateRequest {
    #[serde(default)]
    pub context: Context,
}

pub async fn issue_mandate(
    State(state): State<Arc<AppState>>,
    agent: AuthenticatedAgent,
    Json(body): Json<IssueMandateRequest>,
) -> AppResult<Json<Value>> {
    let mandate = state.orchestrator().issue(&agent.0.id, body.context).await?;
    Ok(Json(json!({
        "mandateId": mandate.id,
        "effectiveAuthority": mandate.authority,
        "expiresAt": mandate.expires_at,
    })))
}

pub async fn get_mandate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    agent: AuthenticatedAgent,
) -> AppResult<Json<Value>> {
    let mandate = state.orchestrator().find_one(&id).await?;
    agent.require_owner(&mandate.agent_id)?;
    Ok(Json(json!(mandate)))
}

// ----------------------------------------------------------------- audit ---

pub async fn submit_audit(
    State(state): State<Arc<AppState>>,
    agent: AuthenticatedAgent,
    Json(mut entry): Json<AuditEntry>,
) -> AppResult<(StatusCode, Json<Value>)> {
    entry.agent_id = agent.0.id.clone();
    state.audit.append(entry).await?;
    Ok((StatusCode::CREATED, Json(json!({ "status": "recorded" }))))
}

pub async fn submit_audit_bulk(
    State(state): State<Arc<AppState>>,
    agent: AuthenticatedAgent,
    Json(entries): Json<Vec<AuditEntry>>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let count = entries.len();
    for mut entry in entries {
        entry.agent_id = agent.0.id.clone();
        state.audit.append(entry).await?;
    }
    Ok((StatusCode::CREATED, Json(json!({ "status": "recorded", "count": count }))))
}

#[derive(Deserialize, Default)]
pub struct AuditQueryParams {
    pub decision: Option<String>,
    #[serde(rename = "actionType")]
    pub action_type: Option<String>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    agent: AuthenticatedAgent,
    Query(params): Query<AuditQueryParams>,
) -> AppResult<Json<Value>> {
    let decision = match params.decision.as_deref() {
        None => None,
        Some("ALLOW") => Some(AuditDecision::Allow),
        Some("BLOCK") => Some(AuditDecision::Block),
        Some(other) => {
            return Err(ApiError(ReaperError::InvalidContext { reason: format!("unknown decision filter '{other}'") }))
        }
    };
    let action_type = match params.action_type.as_deref() {
        None => None,
        Some("mandate_issued") => Some(reaper_core::ActionType::MandateIssued),
        Some("tool_call") => Some(reaper_core::ActionType::ToolCall),
        Some("llm_call") => Some(reaper_core::ActionType::LlmCall),
        Some("kill") => Some(reaper_core::ActionType::Kill),
        Some("resurrect") => Some(reaper_core::ActionType::Resurrect),
        Some(other) => {
            return Err(ApiError(ReaperError::InvalidContext { reason: format!("unknown actionType filter '{other}'") }))
        }
    };
    let query = AuditQuery { agent_id: agent.0.id.clone(), decision, action_type, from: params.from, to: params.to };
    let entries = state.audit.query(query).await?;
    Ok(Json(json!({ "total": entries.len(), "entries": entries })))
}
