//! Policy Engine
//!
//! The issuance-side algorithms (rule evaluation, policy composition, mandate
//! issuance) and the enforcement-side pure engine and two-phase executor,
//! plus in-memory store implementations satisfying `reaper_core`'s traits.

pub mod agent_store;
pub mod composer;
pub mod engine;
pub mod evaluator;
pub mod executor;
pub mod mandate_store;
pub mod orchestrator;
pub mod policy_store;
pub mod rule_store;
pub mod state_distributed;
pub mod state_memory;

pub use agent_store::InMemoryAgentStore;
pub use composer::compose;
pub use engine::authorize;
pub use evaluator::{evaluate, Matched};
pub use executor::{ExecutionOutcome, TwoPhaseExecutor};
pub use mandate_store::InMemoryMandateStore;
pub use orchestrator::IssuanceOrchestrator;
pub use policy_store::InMemoryPolicyStore;
pub use rule_store::InMemoryRuleStore;
pub use state_distributed::DistributedStateManager;
pub use state_memory::MemoryStateManager;

pub use reaper_core;
pub use reaper_core::{Policy, PolicyId, PolicyVersion, ReaperError, Result};
