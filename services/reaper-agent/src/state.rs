//! Composition root for the enforcement sidecar (§9 "global singletons become
//! explicit fields"): the state manager backend is selected once at startup
//! by `store_dsn` and then addressed only through the shared `StateManager`
//! trait (§4.7) — callers never know which backend they're talking to.

use metrics::InMemoryAuditSink;
use policy_engine::{DistributedStateManager, MemoryStateManager};
use reaper_core::{ChargingPolicy, StateManager};

use crate::config::ServiceConfig;

pub struct AppState {
    pub config: ServiceConfig,
    pub state_manager: Box<dyn StateManager>,
    pub audit: InMemoryAuditSink,
    pub charging_policy: ChargingPolicy,
    pub http: reqwest::Client,
}

impl AppState {
    pub async fn new(config: ServiceConfig) -> reaper_core::Result<Self> {
        let state_manager: Box<dyn StateManager> = if config.store_dsn.starts_with("redis://") {
            Box::new(DistributedStateManager::connect(&config.store_dsn).await?)
        } else {
            Box::new(MemoryStateManager::new())
        };
        Ok(AppState {
            config,
            state_manager,
            audit: InMemoryAuditSink::new(),
            charging_policy: ChargingPolicy::SuccessBased,
            http: reqwest::Client::new(),
        })
    }
}
