//! Shared vocabulary for the two-phase executor (C12) and the pure policy
//! engine (C11): what an agent is asking to do, and what the engine decided.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::BlockCode;

/// Which side of the ledger a cost belongs to; composition and budgets treat
/// both the same, but runtime state tracks them separately for reporting
/// (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostClass {
    Cognition,
    Execution,
}

/// The kind of action being authorized; tool-scope checks (§4.5 step 4) only
/// apply to `ToolCall`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ActionKind {
    ToolCall { tool_name: String },
    LlmCall,
}

/// A single request for authority: "may I do this, for this much money?"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub kind: ActionKind,
    pub estimated_cost: f64,
    pub cost_class: CostClass,
}

impl Action {
    pub fn tool_name(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::ToolCall { tool_name } => Some(tool_name.as_str()),
            ActionKind::LlmCall => None,
        }
    }
}

/// The pure policy engine's verdict (§4.5). `ALLOW` and `BLOCK` are both
/// values, not exceptions — the two-phase executor is what raises a
/// `ReaperError::Blocked` from a `Decision::Block`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decision {
    Allow { reason: String, remaining_cost: Option<f64> },
    Block { reason: String, code: BlockCode },
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    pub fn allow(reason: impl Into<String>, remaining_cost: Option<f64>) -> Self {
        Decision::Allow { reason: reason.into(), remaining_cost }
    }

    pub fn block(code: BlockCode, reason: impl Into<String>) -> Self {
        Decision::Block { reason: reason.into(), code }
    }
}

/// The inputs a `Custom` charging policy's settlement function is given
/// (§4.6 step 4, `CUSTOM compute(ctx)`).
#[derive(Debug, Clone, Copy)]
pub struct SettlementContext {
    pub estimated_cost: f64,
    pub actual_cost: Option<f64>,
    pub success: bool,
}

/// How an executed action's settled cost is computed from its estimate and
/// outcome (§4.6 step 4).
#[derive(Clone)]
pub enum ChargingPolicy {
    SuccessBased,
    AttemptBased,
    /// `attemptCost + (success ? successCost : 0)` — both amounts are
    /// absolute, not a proportion of the estimate.
    Tiered { attempt_cost: f64, success_cost: f64 },
    /// Caller-supplied settlement function. Must be pure and deterministic
    /// for a given `SettlementContext`: no I/O, no reliance on state outside
    /// the context, since the executor treats it as a value computation, not
    /// a side effect.
    Custom(Arc<dyn Fn(&SettlementContext) -> f64 + Send + Sync>),
}

impl std::fmt::Debug for ChargingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargingPolicy::SuccessBased => write!(f, "SuccessBased"),
            ChargingPolicy::AttemptBased => write!(f, "AttemptBased"),
            ChargingPolicy::Tiered { attempt_cost, success_cost } => f
                .debug_struct("Tiered")
                .field("attempt_cost", attempt_cost)
                .field("success_cost", success_cost)
                .finish(),
            ChargingPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl ChargingPolicy {
    /// Settle a cost given the action's estimate, any actual cost reported by
    /// the caller, and whether execution (and verification) succeeded.
    pub fn settle(&self, estimated_cost: f64, actual_cost: Option<f64>, success: bool) -> f64 {
        match self {
            ChargingPolicy::SuccessBased => {
                if success {
                    actual_cost.unwrap_or(estimated_cost)
                } else {
                    0.0
                }
            }
            ChargingPolicy::AttemptBased => actual_cost.unwrap_or(estimated_cost),
            ChargingPolicy::Tiered { attempt_cost, success_cost } => {
                attempt_cost + if success { *success_cost } else { 0.0 }
            }
            ChargingPolicy::Custom(compute) => {
                compute(&SettlementContext { estimated_cost, actual_cost, success })
            }
        }
    }
}
