//! Memory state manager backend (C10): a per-`(agent, mandate)` mutex
//! serialises `check_and_commit` and `kill`, matching §4.7's "single-owner
//! lane" requirement without needing a shared external store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use reaper_core::{
    AgentId, Authority, CommitRejection, MandateId, RateWindow, RuntimeState, StateChange,
    StateManager, AGENT_RATE_WINDOW_KEY,
};
use tokio::sync::{broadcast, oneshot};
use tracing::instrument;

type Key = (AgentId, MandateId);

struct Lane {
    state: Mutex<RuntimeState>,
    kill_tx: broadcast::Sender<String>,
}

impl Default for Lane {
    fn default() -> Self {
        let (kill_tx, _rx) = broadcast::channel(8);
        Lane { state: Mutex::new(RuntimeState::default()), kill_tx }
    }
}

/// In-process [`StateManager`] suitable for a single-instance agent runtime
/// or test harness; `checkAndCommit` atomicity is a mutex per key (§4.7).
#[derive(Default)]
pub struct MemoryStateManager {
    lanes: DashMap<Key, Arc<Lane>>,
}

impl MemoryStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane(&self, agent_id: &AgentId, mandate_id: &MandateId) -> Arc<Lane> {
        self.lanes.entry((agent_id.clone(), mandate_id.clone())).or_default().clone()
    }
}

fn advance_window(
    windows: &mut BTreeMap<String, RateWindow>,
    key: &str,
    now: chrono::DateTime<chrono::Utc>,
    limit_ms_hint: Option<u64>,
) {
    let entry = windows.entry(key.to_string()).or_insert_with(|| RateWindow::starting_now(now));
    if let Some(window_ms) = limit_ms_hint {
        if (now - entry.window_start).num_milliseconds() >= window_ms as i64 {
            *entry = RateWindow::starting_now(now);
        }
    }
    entry.count += 1;
}

#[async_trait]
impl StateManager for MemoryStateManager {
    async fn get(&self, agent_id: &AgentId, mandate_id: &MandateId) -> RuntimeState {
        let lane = self.lane(agent_id, mandate_id);
        let guard = lane.state.lock();
        guard.clone()
    }

    #[instrument(skip(self, authority, change))]
    async fn check_and_commit(
        &self,
        agent_id: &AgentId,
        mandate_id: &MandateId,
        authority: &Authority,
        change: StateChange,
    ) -> Result<RuntimeState, CommitRejection> {
        let lane = self.lane(agent_id, mandate_id);
        let mut guard = lane.state.lock();
        let now = Utc::now();

        if guard.seen_action_ids.contains(&change.action_id) {
            return Err(CommitRejection::Replay);
        }
        if guard.killed {
            return Err(CommitRejection::Killed);
        }
        if let Some(max_total) = authority.max_cost_total {
            if guard.cumulative_cost + change.settled_cost > max_total {
                return Err(CommitRejection::TotalBudget);
            }
        }
        if let Some(max_per_call) = authority.max_cost_per_call {
            if change.settled_cost > max_per_call {
                return Err(CommitRejection::PerCallLimit);
            }
        }
        if let Some(rate_limit) = &authority.rate_limit {
            let count = guard.rate_window_count(AGENT_RATE_WINDOW_KEY, now, rate_limit);
            if count >= rate_limit.max_calls {
                return Err(CommitRejection::RateLimit);
            }
        }

        guard.seen_action_ids.insert(change.action_id.clone());
        if let Some(key) = &change.idempotency_key {
            guard.seen_idempotency_keys.insert(key.clone());
        }
        guard.cumulative_cost += change.settled_cost;
        match change.cost_class {
            reaper_core::CostClass::Cognition => guard.cognition_cost += change.settled_cost,
            reaper_core::CostClass::Execution => guard.execution_cost += change.settled_cost,
        }
        guard.call_count += 1;

        let window_ms_hint = authority.rate_limit.map(|r| r.window_ms);
        advance_window(&mut guard.rate_windows, AGENT_RATE_WINDOW_KEY, now, window_ms_hint);

        if let Some(tool_name) = &change.tool_name {
            *guard.per_tool_call_counts.entry(tool_name.clone()).or_insert(0) += 1;
            let tool_window_ms = authority
                .tool_policies
                .get(tool_name)
                .and_then(|tp| tp.rate_limit)
                .map(|r| r.window_ms);
            advance_window(&mut guard.rate_windows, tool_name, now, tool_window_ms);
        }

        Ok(guard.clone())
    }

    async fn kill(&self, agent_id: &AgentId, mandate_id: &MandateId, _reason: String) {
        let lane = self.lane(agent_id, mandate_id);
        {
            let mut guard = lane.state.lock();
            guard.killed = true;
        }
        let _ = lane.kill_tx.send(mandate_id.clone());
    }

    async fn is_killed(&self, agent_id: &AgentId, mandate_id: &MandateId) -> bool {
        self.lane(agent_id, mandate_id).state.lock().killed
    }

    async fn subscribe_kill(
        &self,
        agent_id: &AgentId,
        mandate_id: &MandateId,
    ) -> oneshot::Receiver<String> {
        let lane = self.lane(agent_id, mandate_id);
        let mut rx = lane.kill_tx.subscribe();
        let (tx, out_rx) = oneshot::channel();
        tokio::spawn(async move {
            if let Ok(mandate_id) = rx.recv().await {
                let _ = tx.send(mandate_id);
            }
        });
        out_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaper_core::CostClass;

    fn change(id: &str, cost: f64) -> StateChange {
        StateChange {
            action_id: id.into(),
            settled_cost: cost,
            cost_class: CostClass::Execution,
            tool_name: None,
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn replayed_action_id_is_rejected_on_second_commit() {
        let manager = MemoryStateManager::new();
        let authority = Authority { max_cost_total: Some(10.0), ..Default::default() };
        let agent = "agent-a".to_string();
        let mandate = "mnd-1".to_string();

        manager.check_and_commit(&agent, &mandate, &authority, change("a1", 1.0)).await.unwrap();
        let rejected = manager.check_and_commit(&agent, &mandate, &authority, change("a1", 1.0)).await;
        assert_eq!(rejected, Err(CommitRejection::Replay));
    }

    #[tokio::test]
    async fn commit_rejected_once_budget_exceeded() {
        let manager = MemoryStateManager::new();
        let authority = Authority { max_cost_total: Some(1.0), ..Default::default() };
        let agent = "agent-a".to_string();
        let mandate = "mnd-1".to_string();

        manager.check_and_commit(&agent, &mandate, &authority, change("a1", 0.6)).await.unwrap();
        let rejected = manager.check_and_commit(&agent, &mandate, &authority, change("a2", 0.6)).await;
        assert_eq!(rejected, Err(CommitRejection::TotalBudget));
    }

    #[tokio::test]
    async fn kill_is_final() {
        let manager = MemoryStateManager::new();
        let authority = Authority::default();
        let agent = "agent-a".to_string();
        let mandate = "mnd-1".to_string();

        manager.kill(&agent, &mandate, "operator request".into()).await;
        let rejected = manager.check_and_commit(&agent, &mandate, &authority, change("a1", 0.0)).await;
        assert_eq!(rejected, Err(CommitRejection::Killed));
    }

    #[tokio::test]
    async fn budget_ceiling_allows_exact_match_blocks_first_overage() {
        let manager = MemoryStateManager::new();
        let authority = Authority { max_cost_total: Some(1.0), ..Default::default() };
        let agent = "agent-a".to_string();
        let mandate = "mnd-1".to_string();

        let ok = manager.check_and_commit(&agent, &mandate, &authority, change("a1", 1.0)).await;
        assert!(ok.is_ok());
        let over = manager.check_and_commit(&agent, &mandate, &authority, change("a2", 0.0001)).await;
        assert_eq!(over, Err(CommitRejection::TotalBudget));
    }
}
