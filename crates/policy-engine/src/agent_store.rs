//! In-memory agent store: registration, lookup, and soft-delete for the
//! agent principal that every other component is scoped to.

use async_trait::async_trait;
use dashmap::DashMap;
use reaper_core::{
    id, Agent, AgentId, AgentStatus, AgentStore, AgentUpdate, NewAgent, ReaperError, Result,
};

#[derive(Default)]
pub struct InMemoryAgentStore {
    agents: DashMap<AgentId, Agent>,
    by_api_key_hash: DashMap<String, AgentId>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    async fn create(&self, new_agent: NewAgent) -> Result<(Agent, String)> {
        let agent_id = id::new_agent_id();
        let cleartext_key = id::new_api_key();
        let api_key_hash = id::hash_api_key(&cleartext_key);
        let agent = Agent {
            id: agent_id.clone(),
            api_key_hash: api_key_hash.clone(),
            name: new_agent.name,
            owning_principal: new_agent.owning_principal,
            environment: new_agent.environment,
            status: AgentStatus::Active,
            metadata: new_agent.metadata,
        };
        self.agents.insert(agent_id.clone(), agent.clone());
        self.by_api_key_hash.insert(api_key_hash, agent_id);
        Ok((agent, cleartext_key))
    }

    async fn get(&self, id: &AgentId) -> Result<Agent> {
        self.agents
            .get(id)
            .map(|a| a.clone())
            .ok_or_else(|| ReaperError::AgentNotFound { agent_id: id.clone() })
    }

    async fn find_by_api_key(&self, cleartext_key: &str) -> Result<Agent> {
        let hash = id::hash_api_key(cleartext_key);
        let agent_id = self
            .by_api_key_hash
            .get(&hash)
            .map(|e| e.clone())
            .ok_or_else(|| ReaperError::Unauthorized { reason: "unknown API key".into() })?;
        self.get(&agent_id).await
    }

    async fn list(&self) -> Result<Vec<Agent>> {
        Ok(self.agents.iter().map(|e| e.value().clone()).collect())
    }

    async fn update(&self, id: &AgentId, update: AgentUpdate) -> Result<Agent> {
        let mut entry = self
            .agents
            .get_mut(id)
            .ok_or_else(|| ReaperError::AgentNotFound { agent_id: id.clone() })?;
        if let Some(name) = update.name {
            entry.name = name;
        }
        if let Some(owning_principal) = update.owning_principal {
            entry.owning_principal = owning_principal;
        }
        if let Some(environment) = update.environment {
            entry.environment = environment;
        }
        if let Some(metadata) = update.metadata {
            entry.metadata = metadata;
        }
        Ok(entry.clone())
    }

    async fn soft_delete(&self, id: &AgentId) -> Result<Agent> {
        self.set_status(id, AgentStatus::Inactive).await
    }

    async fn set_status(&self, id: &AgentId, status: AgentStatus) -> Result<Agent> {
        let mut entry = self
            .agents
            .get_mut(id)
            .ok_or_else(|| ReaperError::AgentNotFound { agent_id: id.clone() })?;
        entry.status = status;
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaper_core::Environment;

    fn sample() -> NewAgent {
        NewAgent {
            name: "agent-smith".into(),
            owning_principal: "team-x".into(),
            environment: Environment::Development,
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn create_returns_cleartext_key_once_and_stores_only_its_hash() {
        let store = InMemoryAgentStore::new();
        let (agent, cleartext) = store.create(sample()).await.unwrap();
        assert_ne!(agent.api_key_hash, cleartext);
        assert_eq!(agent.api_key_hash, id::hash_api_key(&cleartext));
    }

    #[tokio::test]
    async fn find_by_api_key_resolves_the_owning_agent() {
        let store = InMemoryAgentStore::new();
        let (agent, cleartext) = store.create(sample()).await.unwrap();
        let found = store.find_by_api_key(&cleartext).await.unwrap();
        assert_eq!(found.id, agent.id);
    }

    #[tokio::test]
    async fn soft_delete_flips_status_without_removing_the_row() {
        let store = InMemoryAgentStore::new();
        let (agent, _) = store.create(sample()).await.unwrap();
        let deleted = store.soft_delete(&agent.id).await.unwrap();
        assert_eq!(deleted.status, AgentStatus::Inactive);
        assert!(store.get(&agent.id).await.is_ok());
    }
}
