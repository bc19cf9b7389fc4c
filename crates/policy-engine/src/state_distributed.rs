//! Distributed state manager backend (C10), grounded on `redis` (§9 design
//! note): a Lua script performs the atomic check-and-commit, and kill
//! propagation rides Redis pub/sub on a per-`(agent, mandate)` channel.
//!
//! The script is the only authoritative reader/writer for a state key;
//! `get` is advisory (§4.7) since nothing prevents a concurrent writer from
//! mutating state between an advisory read and its caller's next action.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use reaper_core::{
    AgentId, Authority, CommitRejection, MandateId, RuntimeState, StateChange, StateManager,
};
use tokio::sync::oneshot;
use tracing::{instrument, warn};

/// Performs the same predicate order as the pure engine (replay, kill,
/// budget, rate limit) before mutating the serialized state blob stored at
/// `KEYS[1]`, then advances the agent-level and (if the action was a tool
/// call) per-tool sliding windows the same way `state_memory.rs`'s
/// `advance_window` does. `ARGV` carries the JSON-encoded change, the
/// authority's ceilings, and the caller's clock reading so the whole
/// decide-and-mutate step is one atomic round trip.
const CHECK_AND_COMMIT_SCRIPT: &str = r#"
local state_json = redis.call('GET', KEYS[1])
local state = state_json and cjson.decode(state_json) or {
    cumulative_cost = 0, cognition_cost = 0, execution_cost = 0, call_count = 0,
    per_tool_call_counts = {}, rate_windows = {}, seen_action_ids = {}, killed = false
}

local change = cjson.decode(ARGV[1])
local max_cost_total = tonumber(ARGV[2])
local max_cost_per_call = tonumber(ARGV[3])
local agent_max_calls = tonumber(ARGV[4])
local agent_window_ms = tonumber(ARGV[5])
local tool_window_ms = tonumber(ARGV[6])
local now_ms = tonumber(ARGV[7])
local now_iso = ARGV[8]

local function window_count(key, window_ms)
    local w = state.rate_windows[key]
    if w == nil then
        return 0
    end
    if window_ms and (now_ms - w.window_start_ms) >= window_ms then
        return 0
    end
    return w.count
end

local function advance_window(key, window_ms)
    local w = state.rate_windows[key]
    if w == nil or (window_ms and (now_ms - w.window_start_ms) >= window_ms) then
        w = { window_start = now_iso, window_start_ms = now_ms, count = 0 }
    end
    w.count = w.count + 1
    state.rate_windows[key] = w
end

if state.seen_action_ids[change.action_id] then
    return 'REPLAY'
end
if state.killed then
    return 'KILLED'
end
if max_cost_total and (state.cumulative_cost + change.settled_cost) > max_cost_total then
    return 'TOTAL_BUDGET'
end
if max_cost_per_call and change.settled_cost > max_cost_per_call then
    return 'PER_CALL_LIMIT'
end
if agent_max_calls and window_count('__agent__', agent_window_ms) >= agent_max_calls then
    return 'RATE_LIMIT'
end

state.seen_action_ids[change.action_id] = true
state.cumulative_cost = state.cumulative_cost + change.settled_cost
if change.cost_class == 'cognition' then
    state.cognition_cost = state.cognition_cost + change.settled_cost
else
    state.execution_cost = state.execution_cost + change.settled_cost
end
state.call_count = state.call_count + 1

advance_window('__agent__', agent_window_ms)

if change.tool_name and change.tool_name ~= cjson.null then
    state.per_tool_call_counts[change.tool_name] = (state.per_tool_call_counts[change.tool_name] or 0) + 1
    advance_window(change.tool_name, tool_window_ms)
end

redis.call('SET', KEYS[1], cjson.encode(state))
return cjson.encode(state)
"#;

fn state_key(agent_id: &AgentId, mandate_id: &MandateId) -> String {
    format!("reaper:state:{agent_id}:{mandate_id}")
}

fn kill_channel(agent_id: &AgentId, mandate_id: &MandateId) -> String {
    format!("reaper:kill:{agent_id}:{mandate_id}")
}

/// `StateManager` backed by a shared Redis instance, for enforcement cores
/// deployed as N workers behind one mandate (§4.7, §5).
pub struct DistributedStateManager {
    conn: ConnectionManager,
    client: redis::Client,
    script: Script,
}

impl DistributedStateManager {
    pub async fn connect(dsn: &str) -> reaper_core::Result<Self> {
        let client = redis::Client::open(dsn)
            .map_err(|e| reaper_core::ReaperError::StoreUnavailable { reason: e.to_string() })?;
        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| reaper_core::ReaperError::StoreUnavailable { reason: e.to_string() })?;
        Ok(DistributedStateManager { conn, client, script: Script::new(CHECK_AND_COMMIT_SCRIPT) })
    }
}

#[async_trait]
impl StateManager for DistributedStateManager {
    async fn get(&self, agent_id: &AgentId, mandate_id: &MandateId) -> RuntimeState {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(state_key(agent_id, mandate_id)).await.unwrap_or(None);
        raw.and_then(|json| serde_json::from_str(&json).ok()).unwrap_or_default()
    }

    #[instrument(skip(self, authority, change))]
    async fn check_and_commit(
        &self,
        agent_id: &AgentId,
        mandate_id: &MandateId,
        authority: &Authority,
        change: StateChange,
    ) -> Result<RuntimeState, CommitRejection> {
        let mut conn = self.conn.clone();
        let change_json = serde_json::to_string(&ChangeWire::from(&change))
            .map_err(|e| CommitRejection::StoreUnavailable(e.to_string()))?;

        let tool_window_ms = change
            .tool_name
            .as_deref()
            .and_then(|tool| authority.tool_policies.get(tool))
            .and_then(|tp| tp.rate_limit)
            .map(|r| r.window_ms);
        let now = chrono::Utc::now();

        let result: redis::RedisResult<String> = self
            .script
            .key(state_key(agent_id, mandate_id))
            .arg(change_json)
            .arg(authority.max_cost_total.map(|v| v.to_string()).unwrap_or_default())
            .arg(authority.max_cost_per_call.map(|v| v.to_string()).unwrap_or_default())
            .arg(authority.rate_limit.map(|r| r.max_calls.to_string()).unwrap_or_default())
            .arg(authority.rate_limit.map(|r| r.window_ms.to_string()).unwrap_or_default())
            .arg(tool_window_ms.map(|ms| ms.to_string()).unwrap_or_default())
            .arg(now.timestamp_millis().to_string())
            .arg(now.to_rfc3339())
            .invoke_async(&mut conn)
            .await;

        match result {
            Ok(raw) => match raw.as_str() {
                "REPLAY" => Err(CommitRejection::Replay),
                "KILLED" => Err(CommitRejection::Killed),
                "TOTAL_BUDGET" => Err(CommitRejection::TotalBudget),
                "PER_CALL_LIMIT" => Err(CommitRejection::PerCallLimit),
                "RATE_LIMIT" => Err(CommitRejection::RateLimit),
                json => serde_json::from_str(json)
                    .map_err(|e| CommitRejection::StoreUnavailable(e.to_string())),
            },
            Err(e) => {
                warn!(error = %e, "redis check_and_commit failed");
                Err(CommitRejection::StoreUnavailable(e.to_string()))
            }
        }
    }

    async fn kill(&self, agent_id: &AgentId, mandate_id: &MandateId, reason: String) {
        let mut conn = self.conn.clone();
        let key = state_key(agent_id, mandate_id);
        let raw: Option<String> = conn.get(&key).await.unwrap_or(None);
        let mut state: RuntimeState = raw.and_then(|j| serde_json::from_str(&j).ok()).unwrap_or_default();
        state.killed = true;
        if let Ok(json) = serde_json::to_string(&state) {
            let _: redis::RedisResult<()> = conn.set(&key, json).await;
        }
        let _: redis::RedisResult<()> =
            conn.publish(kill_channel(agent_id, mandate_id), reason).await;
    }

    async fn is_killed(&self, agent_id: &AgentId, mandate_id: &MandateId) -> bool {
        self.get(agent_id, mandate_id).await.killed
    }

    async fn subscribe_kill(
        &self,
        agent_id: &AgentId,
        mandate_id: &MandateId,
    ) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        let channel = kill_channel(agent_id, mandate_id);
        let client = self.client.clone();
        tokio::spawn(async move {
            let Ok(mut pubsub) = client.get_async_pubsub().await else {
                // Subscription link down: caller's next mutating check MUST
                // still fail closed via the script's own kill check (§4.7).
                return;
            };
            if pubsub.subscribe(&channel).await.is_err() {
                return;
            }
            let mut stream = pubsub.on_message();
            if let Some(msg) = stream.next().await {
                let reason: String = msg.get_payload().unwrap_or_default();
                let _ = tx.send(reason);
            }
        });
        rx
    }
}

/// Wire shape for [`StateChange`] sent to the Lua script; `cjson` needs plain
/// JSON-compatible field names and an explicit `cost_class` string.
#[derive(serde::Serialize)]
struct ChangeWire {
    action_id: String,
    settled_cost: f64,
    cost_class: &'static str,
    tool_name: Option<String>,
}

impl From<&StateChange> for ChangeWire {
    fn from(c: &StateChange) -> Self {
        ChangeWire {
            action_id: c.action_id.clone(),
            settled_cost: c.settled_cost,
            cost_class: match c.cost_class {
                reaper_core::CostClass::Cognition => "cognition",
                reaper_core::CostClass::Execution => "execution",
            },
            tool_name: c.tool_name.clone(),
        }
    }
}
