//! Store contracts (§9 design note: "the store interface is a minimal set of
//! operations"). Any backend satisfying these traits is acceptable; this
//! workspace ships in-memory implementations (policy-engine, message-queue,
//! metrics) since it carries no SQL driver dependency, but the trait boundary
//! is where a transactional store would plug in without touching C2–C13.

use async_trait::async_trait;

use crate::agent::{Agent, AgentId, AgentStatus, AgentUpdate, NewAgent};
use crate::audit::{AuditEntry, AuditQuery};
use crate::context::Context;
use crate::error::Result;
use crate::kill::KillEntry;
use crate::mandate::{Mandate, MandateId};
use crate::policy::{NewPolicy, Policy, PolicyId, PolicyUpdate, PolicyVersion};
use crate::rule::{NewRule, Rule, RuleId, RuleUpdate, RuleVersion};

#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Register a new agent, returning it alongside the cleartext API key.
    /// The cleartext key is never persisted (only its SHA-256 hash is) and
    /// is returned to the caller exactly once (§3, §6).
    async fn create(&self, new_agent: NewAgent) -> Result<(Agent, String)>;

    async fn get(&self, id: &AgentId) -> Result<Agent>;

    async fn find_by_api_key(&self, cleartext_key: &str) -> Result<Agent>;

    async fn list(&self) -> Result<Vec<Agent>>;

    async fn update(&self, id: &AgentId, update: AgentUpdate) -> Result<Agent>;

    /// Soft-delete: flips `status` to `Inactive`, never removes the row.
    async fn soft_delete(&self, id: &AgentId) -> Result<Agent>;

    async fn set_status(&self, id: &AgentId, status: AgentStatus) -> Result<Agent>;
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn insert_new(&self, new_policy: NewPolicy) -> Result<Policy>;

    async fn get_latest_active(&self, id: &PolicyId) -> Result<Policy>;

    async fn get_version(&self, id: &PolicyId, version: PolicyVersion) -> Result<Policy>;

    async fn list_active(&self) -> Result<Vec<Policy>>;

    async fn list_all(&self) -> Result<Vec<Policy>>;

    /// Create `version + 1` from `update`, deactivating the previous
    /// version, under a row-level lock on the latest version (I1, §6).
    async fn update(&self, id: &PolicyId, update: PolicyUpdate) -> Result<Policy>;

    /// `version = None` deletes (deactivates) every version; `Some(v)`
    /// deletes only that version.
    async fn delete(&self, id: &PolicyId, version: Option<PolicyVersion>) -> Result<()>;
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn insert_new(&self, new_rule: NewRule) -> Result<Rule>;

    async fn get_latest(&self, id: &RuleId) -> Result<Rule>;

    async fn get_version(&self, id: &RuleId, version: RuleVersion) -> Result<Rule>;

    /// All currently-active rules, ordered `(version DESC, id ASC)` — the
    /// stable tiebreaker the rule evaluator relies on for reproducibility
    /// (§4.2 step 6).
    async fn list_active(&self) -> Result<Vec<Rule>>;

    async fn list_all(&self) -> Result<Vec<Rule>>;

    async fn update(&self, id: &RuleId, update: RuleUpdate) -> Result<Rule>;

    async fn delete(&self, id: &RuleId) -> Result<()>;
}

#[async_trait]
pub trait MandateStore: Send + Sync {
    async fn insert(&self, mandate: Mandate) -> Result<()>;

    /// Returns `NOT_FOUND` both when the mandate doesn't exist and when it
    /// has expired (§4.4).
    async fn find_one(&self, id: &MandateId) -> Result<Mandate>;

    /// Most recent non-expired mandate for `agent_id` whose stored context
    /// is key-set and value equal to `context`. Read-through cache lookup;
    /// no side effects (§4.4).
    async fn find_by_agent_and_context(
        &self,
        agent_id: &AgentId,
        context: &Context,
    ) -> Result<Option<Mandate>>;
}

#[async_trait]
pub trait KillRegistry: Send + Sync {
    /// Idempotent upsert; also flips the agent's status to `Inactive`.
    async fn kill(&self, agent_id: &AgentId, reason: String, killed_by: String) -> Result<KillEntry>;

    async fn is_killed(&self, agent_id: &AgentId) -> bool;

    async fn status(&self, agent_id: &AgentId) -> Option<KillEntry>;

    /// Deletes the kill entry and flips status back to `Active`.
    async fn resurrect(&self, agent_id: &AgentId) -> Result<()>;

    /// Subscribe for kill notifications broadcast for `agent_id`; delivery
    /// is eventually consistent with bounded latency (§5).
    async fn subscribe(&self, agent_id: &AgentId) -> tokio::sync::broadcast::Receiver<KillEntry>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append-only: no update, no delete (§3, I6).
    async fn append(&self, entry: AuditEntry) -> Result<()>;

    /// Ordered by timestamp descending, capped at [`crate::audit::AUDIT_QUERY_LIMIT`]
    /// (§4.8).
    async fn query(&self, query: AuditQuery) -> Result<Vec<AuditEntry>>;
}
