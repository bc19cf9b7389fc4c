//! In-memory audit sink (C13): append-only decision log queried by agent,
//! decision, action type, and time range, capped at
//! [`reaper_core::AUDIT_QUERY_LIMIT`] rows (§4.8).

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use reaper_core::{AgentId, AuditEntry, AuditQuery, AuditSink, Result, AUDIT_QUERY_LIMIT};

#[derive(Default)]
pub struct InMemoryAuditSink {
    entries: DashMap<AgentId, RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        self.entries.entry(entry.agent_id.clone()).or_default().write().push(entry);
        Ok(())
    }

    async fn query(&self, query: AuditQuery) -> Result<Vec<AuditEntry>> {
        let Some(rows) = self.entries.get(&query.agent_id) else {
            return Ok(vec![]);
        };
        let mut matched: Vec<AuditEntry> = rows
            .read()
            .iter()
            .filter(|e| query.decision.map_or(true, |d| d == e.decision))
            .filter(|e| query.action_type.as_ref().map_or(true, |t| t == &e.action_type))
            .filter(|e| query.from.map_or(true, |from| e.timestamp >= from))
            .filter(|e| query.to.map_or(true, |to| e.timestamp < to))
            .cloned()
            .collect();
        matched.sort_by_key(|e| std::cmp::Reverse(e.timestamp));
        matched.truncate(AUDIT_QUERY_LIMIT);
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use reaper_core::{ActionType, AuditDecision};
    use serde_json::json;

    fn entry(agent_id: &str, decision: AuditDecision, action_type: ActionType) -> AuditEntry {
        AuditEntry {
            agent_id: agent_id.to_string(),
            action_id: "action-1".to_string(),
            timestamp: Utc::now(),
            action_type,
            tool_name: None,
            mandate_id: None,
            decision,
            reason: "test".to_string(),
            block_code: None,
            estimated_cost: None,
            actual_cost: None,
            cumulative_cost: None,
            context: None,
            matched_rules: vec![],
            applied_policies: vec![],
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn query_filters_by_agent_and_decision() {
        let sink = InMemoryAuditSink::new();
        sink.append(entry("agent-a", AuditDecision::Allow, ActionType::ToolCall)).await.unwrap();
        sink.append(entry("agent-a", AuditDecision::Block, ActionType::ToolCall)).await.unwrap();
        sink.append(entry("agent-b", AuditDecision::Allow, ActionType::ToolCall)).await.unwrap();

        let query = AuditQuery { agent_id: "agent-a".to_string(), decision: Some(AuditDecision::Block), ..Default::default() };
        let rows = sink.query(query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].decision, AuditDecision::Block);
    }

    #[tokio::test]
    async fn query_orders_newest_first_and_respects_limit() {
        let sink = InMemoryAuditSink::new();
        let mut e1 = entry("agent-a", AuditDecision::Allow, ActionType::ToolCall);
        e1.timestamp = Utc::now() - Duration::seconds(10);
        let mut e2 = entry("agent-a", AuditDecision::Allow, ActionType::ToolCall);
        e2.timestamp = Utc::now();
        sink.append(e1).await.unwrap();
        sink.append(e2.clone()).await.unwrap();

        let rows = sink.query(AuditQuery { agent_id: "agent-a".to_string(), ..Default::default() }).await.unwrap();
        assert_eq!(rows[0].action_id, e2.action_id);
        assert_eq!(rows[0].timestamp, e2.timestamp);
    }

    #[tokio::test]
    async fn query_to_bound_is_half_open() {
        let sink = InMemoryAuditSink::new();
        let boundary = Utc::now();
        let mut at_boundary = entry("agent-a", AuditDecision::Allow, ActionType::ToolCall);
        at_boundary.timestamp = boundary;
        let mut before_boundary = entry("agent-a", AuditDecision::Allow, ActionType::ToolCall);
        before_boundary.timestamp = boundary - Duration::seconds(1);
        sink.append(at_boundary.clone()).await.unwrap();
        sink.append(before_boundary.clone()).await.unwrap();

        let rows = sink
            .query(AuditQuery { agent_id: "agent-a".to_string(), to: Some(boundary), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action_id, before_boundary.action_id);
    }

    #[tokio::test]
    async fn query_for_unknown_agent_returns_empty() {
        let sink = InMemoryAuditSink::new();
        let rows = sink.query(AuditQuery { agent_id: "nobody".to_string(), ..Default::default() }).await.unwrap();
        assert!(rows.is_empty());
    }
}
