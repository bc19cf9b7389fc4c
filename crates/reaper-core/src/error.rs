//! Error types for the Reaper platform

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReaperError>;

/// Machine-readable reason a policy engine check blocked an action.
///
/// Kept separate from [`ReaperError`] because a block is a value returned by a
/// pure function (§4.5), not necessarily an exception; the two-phase executor
/// is what turns a `Block` into a raised `ReaperError::Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlockCode {
    Replay,
    Killed,
    Expired,
    ToolDenied,
    ToolNotAllowed,
    PerCallLimit,
    TotalBudget,
    RateLimit,
}

impl BlockCode {
    /// Hard blocks can never be retried with the same mandate; soft blocks
    /// (rate limits) may succeed later once a window rolls over.
    pub fn is_hard(self) -> bool {
        !matches!(self, BlockCode::RateLimit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockCode::Replay => "REPLAY",
            BlockCode::Killed => "KILLED",
            BlockCode::Expired => "EXPIRED",
            BlockCode::ToolDenied => "TOOL_DENIED",
            BlockCode::ToolNotAllowed => "TOOL_NOT_ALLOWED",
            BlockCode::PerCallLimit => "PER_CALL_LIMIT",
            BlockCode::TotalBudget => "TOTAL_BUDGET",
            BlockCode::RateLimit => "RATE_LIMIT",
        }
    }
}

impl std::fmt::Display for BlockCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ReaperError {
    #[error("policy not found: {policy_id}")]
    PolicyNotFound { policy_id: String },

    #[error("rule not found: {rule_id}")]
    RuleNotFound { rule_id: String },

    #[error("agent not found: {agent_id}")]
    AgentNotFound { agent_id: String },

    #[error("mandate not found: {mandate_id}")]
    MandateNotFound { mandate_id: String },

    #[error("invalid policy definition: {reason}")]
    InvalidPolicy { reason: String },

    #[error("invalid glob pattern: {pattern}")]
    InvalidPattern { pattern: String },

    #[error("invalid context: {reason}")]
    InvalidContext { reason: String },

    #[error("agent is inactive: {agent_id}")]
    AgentInactive { agent_id: String },

    #[error("agent has been killed: {agent_id}")]
    AgentKilled { agent_id: String },

    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("version conflict updating {resource} {id}")]
    Conflict { resource: String, id: String },

    #[error("store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("settlement refused after execution: {reason}")]
    InconsistentSettlement { reason: String },

    #[error("action blocked: {code} ({reason})")]
    Blocked { code: BlockCode, reason: String },

    #[error("policy evaluation failed: {reason}")]
    EvaluationError { reason: String },

    #[error("agent communication failed: {reason}")]
    AgentCommunicationError { reason: String },

    #[error("platform operation failed: {reason}")]
    PlatformError { reason: String },

    #[error("configuration error: {reason}")]
    Config { reason: String },

    #[error("serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },
}

impl ReaperError {
    /// The stable error kind name used in HTTP error bodies (§7); never leaks
    /// internal identifiers or secret values.
    pub fn kind(&self) -> &'static str {
        match self {
            ReaperError::PolicyNotFound { .. }
            | ReaperError::RuleNotFound { .. }
            | ReaperError::AgentNotFound { .. }
            | ReaperError::MandateNotFound { .. } => "NOT_FOUND",
            ReaperError::InvalidPolicy { .. }
            | ReaperError::InvalidPattern { .. }
            | ReaperError::InvalidContext { .. }
            | ReaperError::SerializationError { .. } => "INVALID_INPUT",
            ReaperError::AgentInactive { .. } => "AGENT_INACTIVE",
            ReaperError::AgentKilled { .. } => "AGENT_KILLED",
            ReaperError::Unauthorized { .. } => "UNAUTHORIZED",
            ReaperError::Forbidden { .. } => "FORBIDDEN",
            ReaperError::Conflict { .. } => "CONFLICT",
            ReaperError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            ReaperError::InconsistentSettlement { .. } => "INCONSISTENT_SETTLEMENT",
            ReaperError::Blocked { code, .. } => code.as_str(),
            ReaperError::EvaluationError { .. } => "EVALUATION_ERROR",
            ReaperError::AgentCommunicationError { .. } => "AGENT_COMMUNICATION_ERROR",
            ReaperError::PlatformError { .. } => "PLATFORM_ERROR",
            ReaperError::Config { .. } => "CONFIG_ERROR",
        }
    }

    pub fn invalid_context(reason: impl Into<String>) -> Self {
        ReaperError::InvalidContext { reason: reason.into() }
    }

    pub fn blocked(code: BlockCode, reason: impl Into<String>) -> Self {
        ReaperError::Blocked { code, reason: reason.into() }
    }
}
