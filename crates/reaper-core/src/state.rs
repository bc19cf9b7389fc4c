//! State manager contract (C10): the per-(agent, mandate) accumulator that
//! both the memory and distributed backends implement identically (§4.7).

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::CostClass;
use crate::agent::AgentId;
use crate::authority::{Authority, RateLimit};
use crate::error::BlockCode;
use crate::mandate::MandateId;

/// A sliding call-count window keyed by either `"__agent__"` (the
/// agent-level limit) or a tool name (a per-tool limit).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateWindow {
    pub window_start: DateTime<Utc>,
    pub count: u64,
}

impl RateWindow {
    pub fn starting_now(now: DateTime<Utc>) -> Self {
        RateWindow { window_start: now, count: 0 }
    }

    /// Has this window expired as of `now`, per the configured width?
    pub fn is_expired(&self, now: DateTime<Utc>, limit: &RateLimit) -> bool {
        (now - self.window_start).num_milliseconds() >= limit.window_ms as i64
    }
}

/// The key under which the agent-level (as opposed to per-tool) rate window
/// is stored.
pub const AGENT_RATE_WINDOW_KEY: &str = "__agent__";

/// Per-(agent, mandate) accumulated enforcement state (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeState {
    pub cumulative_cost: f64,
    pub cognition_cost: f64,
    pub execution_cost: f64,
    pub call_count: u64,
    pub per_tool_call_counts: BTreeMap<String, u64>,
    pub rate_windows: BTreeMap<String, RateWindow>,
    pub seen_action_ids: HashSet<String>,
    pub seen_idempotency_keys: HashSet<String>,
    pub killed: bool,
}

impl RuntimeState {
    pub fn rate_window_count(&self, key: &str, now: DateTime<Utc>, limit: &RateLimit) -> u64 {
        match self.rate_windows.get(key) {
            Some(w) if !w.is_expired(now, limit) => w.count,
            _ => 0,
        }
    }
}

/// The proposed mutation submitted to `check_and_commit` once an action has
/// actually executed and settled (§4.6, §4.7). `tool_name` drives whether a
/// per-tool call counter and rate window are also advanced.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub action_id: String,
    pub settled_cost: f64,
    pub cost_class: CostClass,
    pub tool_name: Option<String>,
    pub idempotency_key: Option<String>,
}

/// Why `check_and_commit` rejected a proposed change (§4.7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitRejection {
    Replay,
    Killed,
    TotalBudget,
    PerCallLimit,
    RateLimit,
    StoreUnavailable(String),
}

impl CommitRejection {
    pub fn as_block_code(&self) -> Option<BlockCode> {
        match self {
            CommitRejection::Replay => Some(BlockCode::Replay),
            CommitRejection::Killed => Some(BlockCode::Killed),
            CommitRejection::TotalBudget => Some(BlockCode::TotalBudget),
            CommitRejection::PerCallLimit => Some(BlockCode::PerCallLimit),
            CommitRejection::RateLimit => Some(BlockCode::RateLimit),
            CommitRejection::StoreUnavailable(_) => None,
        }
    }
}

/// Shared contract between the memory and distributed state manager
/// backends (§4.7). Backend selection is policy, not mechanism: callers code
/// against this trait only.
#[async_trait]
pub trait StateManager: Send + Sync {
    /// An immutable snapshot of current state; used by the executor's
    /// authorize phase, which must not mutate anything.
    async fn get(&self, agent_id: &AgentId, mandate_id: &MandateId) -> RuntimeState;

    /// Atomically validate and apply `change` against `authority`, the
    /// mandate's composed authority, re-running the same predicate set the
    /// pure policy engine uses (replay, kill, budget, rate limit) before
    /// mutating (I4, I5).
    async fn check_and_commit(
        &self,
        agent_id: &AgentId,
        mandate_id: &MandateId,
        authority: &Authority,
        change: StateChange,
    ) -> Result<RuntimeState, CommitRejection>;

    /// Idempotent: killing an already-killed (agent, mandate) is a no-op
    /// success (P6).
    async fn kill(&self, agent_id: &AgentId, mandate_id: &MandateId, reason: String);

    async fn is_killed(&self, agent_id: &AgentId, mandate_id: &MandateId) -> bool;

    /// Subscribe to kill notifications for a single (agent, mandate) pair.
    /// Returns a receiver that yields once, when a kill is observed; callers
    /// that need to keep watching resubscribe.
    async fn subscribe_kill(
        &self,
        agent_id: &AgentId,
        mandate_id: &MandateId,
    ) -> tokio::sync::oneshot::Receiver<String>;
}
