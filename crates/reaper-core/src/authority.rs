//! Authority: the declarative limits carried by a policy and, once composed,
//! by a mandate (§3, §4.3).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A sliding-window call-rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub max_calls: u64,
    pub window_ms: u64,
}

/// Per-tool overrides layered on top of the authority's global limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPolicy {
    #[serde(default = "default_true")]
    pub allowed: bool,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
}

fn default_true() -> bool {
    true
}

/// Execution-environment limits (e.g. wall-clock seconds, max output bytes);
/// an open, numeric-valued bag so new limit kinds don't require a schema
/// migration — composition (§4.3, §9 open question) applies MIN to every
/// entry uniformly.
pub type ExecutionLimits = BTreeMap<String, f64>;

/// Model-selection constraints for LLM calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub allowed_models: Option<Vec<String>>,
    /// Additional numeric model limits (e.g. `max_tokens`); composed by MIN
    /// like `execution_limits`.
    #[serde(default)]
    pub limits: BTreeMap<String, f64>,
}

/// The full set of declarative limits a policy grants, or a mandate carries
/// once composed from one or more policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Authority {
    #[serde(default)]
    pub max_cost_total: Option<f64>,
    #[serde(default)]
    pub max_cost_per_call: Option<f64>,
    #[serde(default)]
    pub max_cognition_cost: Option<f64>,
    #[serde(default)]
    pub max_execution_cost: Option<f64>,
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
    /// `None` = no whitelist (any tool not denied is allowed). `Some(vec![])`
    /// = deny-all-by-whitelist. These two cases MUST behave differently (§8).
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default)]
    pub denied_tools: Vec<String>,
    #[serde(default)]
    pub tool_policies: BTreeMap<String, ToolPolicy>,
    #[serde(default)]
    pub execution_limits: Option<ExecutionLimits>,
    #[serde(default)]
    pub model_config: Option<ModelConfig>,
}

impl Authority {
    /// The fail-closed authority composition falls back to when zero policies
    /// match (§4.3): everything is denied.
    pub fn deny_all() -> Self {
        Authority {
            max_cost_total: Some(0.0),
            max_cost_per_call: Some(0.0),
            allowed_tools: Some(Vec::new()),
            denied_tools: vec!["*".to_string()],
            ..Default::default()
        }
    }
}
