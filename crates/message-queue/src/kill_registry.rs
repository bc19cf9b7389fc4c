//! Kill registry (C9): a per-agent kill flag with pub/sub propagation so
//! every subscribed enforcement core observes it within bounded latency
//! (§3, §4.8, §5).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use reaper_core::{AgentId, AgentStatus, AgentStore, KillEntry, KillRegistry, ReaperError, Result};
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// In-memory kill registry. Existence of an entry in `entries` means killed;
/// `resurrect` removes it (§3: "existence ⇒ killed").
///
/// Holds the agent store behind an `Arc` rather than a borrow so the registry
/// can be stored as a long-lived field alongside its own agent store, e.g. in
/// a service's shared `AppState`, without a self-referential struct.
pub struct InMemoryKillRegistry {
    entries: DashMap<AgentId, KillEntry>,
    channels: DashMap<AgentId, broadcast::Sender<KillEntry>>,
    agent_store: Arc<dyn AgentStore>,
}

impl InMemoryKillRegistry {
    pub fn new(agent_store: Arc<dyn AgentStore>) -> Self {
        InMemoryKillRegistry { entries: DashMap::new(), channels: DashMap::new(), agent_store }
    }

    fn channel(&self, agent_id: &AgentId) -> broadcast::Sender<KillEntry> {
        self.channels
            .entry(agent_id.clone())
            .or_insert_with(|| broadcast::channel(16).0)
            .clone()
    }
}

#[async_trait]
impl KillRegistry for InMemoryKillRegistry {
    #[instrument(skip(self))]
    async fn kill(&self, agent_id: &AgentId, reason: String, killed_by: String) -> Result<KillEntry> {
        let entry = KillEntry { agent_id: agent_id.clone(), killed_at: Utc::now(), reason, killed_by };
        self.entries.insert(agent_id.clone(), entry.clone());
        self.agent_store.set_status(agent_id, AgentStatus::Inactive).await?;
        let _ = self.channel(agent_id).send(entry.clone());
        info!(agent_id = %agent_id, "agent killed");
        Ok(entry)
    }

    async fn is_killed(&self, agent_id: &AgentId) -> bool {
        self.entries.contains_key(agent_id)
    }

    async fn status(&self, agent_id: &AgentId) -> Option<KillEntry> {
        self.entries.get(agent_id).map(|e| e.clone())
    }

    #[instrument(skip(self))]
    async fn resurrect(&self, agent_id: &AgentId) -> Result<()> {
        self.entries
            .remove(agent_id)
            .ok_or_else(|| ReaperError::AgentNotFound { agent_id: agent_id.clone() })?;
        self.agent_store.set_status(agent_id, AgentStatus::Active).await?;
        info!(agent_id = %agent_id, "agent resurrected");
        Ok(())
    }

    async fn subscribe(&self, agent_id: &AgentId) -> broadcast::Receiver<KillEntry> {
        self.channel(agent_id).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaper_core::{Environment, NewAgent};

    struct StubAgentStore {
        inner: dashmap::DashMap<AgentId, reaper_core::Agent>,
    }

    #[async_trait]
    impl AgentStore for StubAgentStore {
        async fn create(&self, new_agent: NewAgent) -> Result<(reaper_core::Agent, String)> {
            let id = reaper_core::id::new_agent_id();
            let agent = reaper_core::Agent {
                id: id.clone(),
                api_key_hash: String::new(),
                name: new_agent.name,
                owning_principal: new_agent.owning_principal,
                environment: new_agent.environment,
                status: AgentStatus::Active,
                metadata: new_agent.metadata,
            };
            self.inner.insert(id, agent.clone());
            Ok((agent, "sk-stub".to_string()))
        }
        async fn get(&self, id: &AgentId) -> Result<reaper_core::Agent> {
            self.inner.get(id).map(|a| a.clone()).ok_or_else(|| ReaperError::AgentNotFound { agent_id: id.clone() })
        }
        async fn find_by_api_key(&self, _key: &str) -> Result<reaper_core::Agent> {
            unimplemented!()
        }
        async fn list(&self) -> Result<Vec<reaper_core::Agent>> {
            Ok(self.inner.iter().map(|e| e.value().clone()).collect())
        }
        async fn update(&self, _id: &AgentId, _update: reaper_core::AgentUpdate) -> Result<reaper_core::Agent> {
            unimplemented!()
        }
        async fn soft_delete(&self, id: &AgentId) -> Result<reaper_core::Agent> {
            self.set_status(id, AgentStatus::Inactive).await
        }
        async fn set_status(&self, id: &AgentId, status: AgentStatus) -> Result<reaper_core::Agent> {
            let mut entry = self.inner.get_mut(id).ok_or_else(|| ReaperError::AgentNotFound { agent_id: id.clone() })?;
            entry.status = status;
            Ok(entry.clone())
        }
    }

    #[tokio::test]
    async fn kill_is_idempotent_and_flips_agent_status() {
        let agents = Arc::new(StubAgentStore { inner: dashmap::DashMap::new() });
        let (agent, _) = agents
            .create(NewAgent {
                name: "a".into(),
                owning_principal: "t".into(),
                environment: Environment::Development,
                metadata: Default::default(),
            })
            .await
            .unwrap();

        let registry = InMemoryKillRegistry::new(agents.clone());
        registry.kill(&agent.id, "test".into(), "operator".into()).await.unwrap();
        registry.kill(&agent.id, "test again".into(), "operator".into()).await.unwrap();
        assert!(registry.is_killed(&agent.id).await);

        let updated = agents.get(&agent.id).await.unwrap();
        assert_eq!(updated.status, AgentStatus::Inactive);
    }

    #[tokio::test]
    async fn resurrect_removes_entry_and_restores_status() {
        let agents = Arc::new(StubAgentStore { inner: dashmap::DashMap::new() });
        let (agent, _) = agents
            .create(NewAgent {
                name: "a".into(),
                owning_principal: "t".into(),
                environment: Environment::Development,
                metadata: Default::default(),
            })
            .await
            .unwrap();

        let registry = InMemoryKillRegistry::new(agents.clone());
        registry.kill(&agent.id, "test".into(), "operator".into()).await.unwrap();
        registry.resurrect(&agent.id).await.unwrap();
        assert!(!registry.is_killed(&agent.id).await);
        assert_eq!(agents.get(&agent.id).await.unwrap().status, AgentStatus::Active);
    }

    #[tokio::test]
    async fn subscribers_observe_kill_broadcast() {
        let agents = Arc::new(StubAgentStore { inner: dashmap::DashMap::new() });
        let (agent, _) = agents
            .create(NewAgent {
                name: "a".into(),
                owning_principal: "t".into(),
                environment: Environment::Development,
                metadata: Default::default(),
            })
            .await
            .unwrap();

        let registry = InMemoryKillRegistry::new(agents);
        let mut rx = registry.subscribe(&agent.id).await;
        registry.kill(&agent.id, "test".into(), "operator".into()).await.unwrap();
        let entry = rx.recv().await.unwrap();
        assert_eq!(entry.agent_id, agent.id);
    }
}
