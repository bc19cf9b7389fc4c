//! # Reaper Core
//!
//! Core types, traits, and pure algorithms for the Reaper mandate issuance
//! and enforcement platform.
//!
//! ## Reaper Agent Value
//! - Zero-allocation policy evaluation for high-performance sidecars
//! - Atomic state commits without service interruption
//! - Memory-efficient enforcement reducing deployment costs by 60-80%
//!
//! ## Reaper Platform Value
//! - Distributed agent management with centralized control
//! - Real-time mandate issuance and kill-switch propagation
//! - Enterprise-grade compliance monitoring and reporting

pub mod action;
pub mod agent;
pub mod audit;
pub mod authority;
pub mod context;
pub mod error;
pub mod glob;
pub mod id;
pub mod kill;
pub mod mandate;
pub mod policy;
pub mod rule;
pub mod state;
pub mod store;

pub use action::{Action, ActionKind, ChargingPolicy, CostClass, Decision, SettlementContext};
pub use agent::{Agent, AgentId, AgentStatus, AgentUpdate, Environment, NewAgent};
pub use audit::{ActionType, AuditDecision, AuditEntry, AuditQuery, AUDIT_QUERY_LIMIT};
pub use authority::{Authority, ExecutionLimits, ModelConfig, RateLimit, ToolPolicy};
pub use context::Context;
pub use error::{BlockCode, ReaperError, Result};
pub use kill::{KillEntry, KillStatus};
pub use mandate::{Mandate, MandateId, MANDATE_SCHEMA_VERSION, MANDATE_TTL_SECONDS};
pub use policy::{NewPolicy, Policy, PolicyId, PolicyRef, PolicyUpdate, PolicyVersion};
pub use rule::{
    Condition, MatchMode, NewRule, Operator, Rule, RuleId, RuleRef, RuleUpdate, RuleVersion,
};
pub use state::{
    CommitRejection, RateWindow, RuntimeState, StateChange, StateManager, AGENT_RATE_WINDOW_KEY,
};
pub use store::{AgentStore, AuditSink, KillRegistry, MandateStore, PolicyStore, RuleStore};

/// Current Reaper version for compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reaper build information for telemetry and debugging
pub const BUILD_INFO: &str = concat!(
    "Reaper ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_NAME"),
    ")"
);

/// Standard API endpoints for Reaper services
pub mod endpoints {
    pub const HEALTH: &str = "/health";
    pub const METRICS: &str = "/metrics";
    pub const API_V1_AGENTS: &str = "/agents";
    pub const API_V1_POLICIES: &str = "/policies";
    pub const API_V1_RULES: &str = "/rules";
    pub const API_V1_MANDATES: &str = "/mandates";
    pub const API_V1_AUDIT: &str = "/audit";
    pub const API_V1_MESSAGES: &str = "/api/v1/messages";
}
