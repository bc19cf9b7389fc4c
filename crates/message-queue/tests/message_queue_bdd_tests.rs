use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cucumber::{given, then, when, World};
use message_queue::InMemoryKillRegistry;
use reaper_core::{Agent, AgentId, AgentStatus, AgentStore, AgentUpdate, Environment, NewAgent, ReaperError, Result};
use tokio::sync::broadcast;

struct StubAgentStore {
    inner: dashmap::DashMap<AgentId, Agent>,
}

impl StubAgentStore {
    fn new() -> Self {
        StubAgentStore { inner: dashmap::DashMap::new() }
    }
}

#[async_trait]
impl AgentStore for StubAgentStore {
    async fn create(&self, new_agent: NewAgent) -> Result<(Agent, String)> {
        let id = new_agent.name.clone();
        let agent = Agent {
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
    async fn get(&self, id: &AgentId) -> Result<Agent> {
        self.inner.get(id).map(|a| a.clone()).ok_or_else(|| ReaperError::AgentNotFound { agent_id: id.clone() })
    }
    async fn find_by_api_key(&self, _key: &str) -> Result<Agent> {
        unimplemented!()
    }
    async fn list(&self) -> Result<Vec<Agent>> {
        Ok(self.inner.iter().map(|e| e.value().clone()).collect())
    }
    async fn update(&self, _id: &AgentId, _update: AgentUpdate) -> Result<Agent> {
        unimplemented!()
    }
    async fn soft_delete(&self, id: &AgentId) -> Result<Agent> {
        self.set_status(id, AgentStatus::Inactive).await
    }
    async fn set_status(&self, id: &AgentId, status: AgentStatus) -> Result<Agent> {
        let mut entry = self.inner.get_mut(id).ok_or_else(|| ReaperError::AgentNotFound { agent_id: id.clone() })?;
        entry.status = status;
        Ok(entry.clone())
    }
}

#[derive(World)]
#[world(init = Self::new)]
struct MessageQueueWorld {
    agents: Arc<StubAgentStore>,
    registry: InMemoryKillRegistry,
    subscribers: HashMap<String, broadcast::Receiver<reaper_core::KillEntry>>,
}

impl std::fmt::Debug for MessageQueueWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueueWorld").finish()
    }
}

impl MessageQueueWorld {
    fn new() -> Self {
        let agents = Arc::new(StubAgentStore::new());
        MessageQueueWorld { agents: agents.clone(), registry: InMemoryKillRegistry::new(agents), subscribers: HashMap::new() }
    }
}

#[given(regex = r#"^an agent "([^"]+)" is registered$"#)]
async fn given_agent_registered(world: &mut MessageQueueWorld, agent_id: String) {
    world
        .agents
        .create(NewAgent {
            name: agent_id,
            owning_principal: "tenant".into(),
            environment: Environment::Development,
            metadata: Default::default(),
        })
        .await
        .unwrap();
}

#[given(regex = r#"^a subscriber is watching "([^"]+)"$"#)]
async fn given_subscriber(world: &mut MessageQueueWorld, agent_id: String) {
    let rx = world.registry.subscribe(&agent_id).await;
    world.subscribers.insert(agent_id, rx);
}

#[when(regex = r#"^the agent "([^"]+)" is killed with reason "([^"]+)"$"#)]
async fn when_killed(world: &mut MessageQueueWorld, agent_id: String, reason: String) {
    world.registry.kill(&agent_id, reason, "operator".into()).await.unwrap();
}

#[when(regex = r#"^the agent "([^"]+)" is resurrected$"#)]
async fn when_resurrected(world: &mut MessageQueueWorld, agent_id: String) {
    world.registry.resurrect(&agent_id).await.unwrap();
}

#[then(regex = r#"^the agent "([^"]+)" should be killed$"#)]
async fn then_killed(world: &mut MessageQueueWorld, agent_id: String) {
    assert!(world.registry.is_killed(&agent_id).await);
}

#[then(regex = r#"^the agent "([^"]+)" should not be killed$"#)]
async fn then_not_killed(world: &mut MessageQueueWorld, agent_id: String) {
    assert!(!world.registry.is_killed(&agent_id).await);
}

#[then(regex = r#"^the subscriber should observe the kill$"#)]
async fn then_subscriber_observed(world: &mut MessageQueueWorld) {
    let rx = world.subscribers.values_mut().next().unwrap();
    let entry = rx.recv().await.unwrap();
    assert!(!entry.reason.is_empty());
}

#[tokio::main]
async fn main() {
    MessageQueueWorld::run("tests/features").await;
}
