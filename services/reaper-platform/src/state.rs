//! Composition root (§9 "global singletons become explicit fields"): every
//! store, the kill registry, and the audit sink wired once at startup and
//! shared across every handler behind an `Arc`.

use std::sync::Arc;

use metrics::InMemoryAuditSink;
use policy_engine::agent_store::InMemoryAgentStore;
use policy_engine::mandate_store::InMemoryMandateStore;
use policy_engine::orchestrator::IssuanceOrchestrator;
use policy_engine::policy_store::InMemoryPolicyStore;
use policy_engine::rule_store::InMemoryRuleStore;
use reaper_core::AgentStore;

use message_queue::InMemoryKillRegistry;

use crate::config::ServiceConfig;

pub struct AppState {
    pub config: ServiceConfig,
    pub agents: Arc<InMemoryAgentStore>,
    pub policies: InMemoryPolicyStore,
    pub rules: InMemoryRuleStore,
    pub mandates: InMemoryMandateStore,
    pub kill_registry: InMemoryKillRegistry,
    pub audit: InMemoryAuditSink,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        let agents = Arc::new(InMemoryAgentStore::new());
        let kill_registry = InMemoryKillRegistry::new(agents.clone() as Arc<dyn AgentStore>);
        AppState {
            config,
            agents,
            policies: InMemoryPolicyStore::new(),
            rules: InMemoryRuleStore::new(),
            mandates: InMemoryMandateStore::new(),
            kill_registry,
            audit: InMemoryAuditSink::new(),
        }
    }

    /// Borrow every dependency for a single issuance call (§4.4). Constructed
    /// fresh per request and dropped at the end of the handler, so borrowing
    /// from `self` here never becomes a long-lived self-reference.
    pub fn orchestrator(&self) -> IssuanceOrchestrator<'_> {
        IssuanceOrchestrator {
            agent_store: self.agents.as_ref(),
            rule_store: &self.rules,
            policy_store: &self.policies,
            mandate_store: &self.mandates,
            kill_registry: &self.kill_registry,
            audit: &self.audit,
        }
    }
}
