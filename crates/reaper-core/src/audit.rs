//! Audit log entry (§3, C13): append-only, structured decision records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::AgentId;
use crate::context::Context;
use crate::error::BlockCode;
use crate::mandate::MandateId;
use crate::policy::PolicyRef;
use crate::rule::RuleRef;

/// The decision recorded for one audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditDecision {
    Allow,
    Block,
}

/// What kind of event this audit row describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    MandateIssued,
    ToolCall,
    LlmCall,
    Kill,
    Resurrect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub agent_id: AgentId,
    pub action_id: String,
    pub timestamp: DateTime<Utc>,
    pub action_type: ActionType,
    pub tool_name: Option<String>,
    pub mandate_id: Option<MandateId>,
    pub decision: AuditDecision,
    pub reason: String,
    pub block_code: Option<BlockCode>,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub cumulative_cost: Option<f64>,
    pub context: Option<Context>,
    pub matched_rules: Vec<RuleRef>,
    pub applied_policies: Vec<PolicyRef>,
    pub metadata: Value,
}

/// Parameters filtering an audit query (§4.8). `agent_id` is always overridden
/// from the authenticated identity by the HTTP layer — callers of the core
/// API supply it directly.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub agent_id: AgentId,
    pub decision: Option<AuditDecision>,
    pub action_type: Option<ActionType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Hard cap on the number of rows returned by one audit query (§4.8, §6).
pub const AUDIT_QUERY_LIMIT: usize = 1000;
