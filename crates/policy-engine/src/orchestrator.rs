//! Issuance orchestrator (C8): the end-to-end mandate issuance flow (§4.4)
//! wiring the agent store, kill registry, context sanitiser, rule evaluator,
//! policy composer, mandate store, and audit sink.

use chrono::Utc;
use reaper_core::{
    context, AgentId, AgentStore, AuditDecision, AuditEntry, AuditSink, Context, KillRegistry,
    Mandate, MandateStore, PolicyRef, PolicyStore, ReaperError, Result, RuleRef, RuleStore,
};
use tracing::instrument;

use crate::composer;
use crate::evaluator;

pub struct IssuanceOrchestrator<'a> {
    pub agent_store: &'a dyn AgentStore,
    pub rule_store: &'a dyn RuleStore,
    pub policy_store: &'a dyn PolicyStore,
    pub mandate_store: &'a dyn MandateStore,
    pub kill_registry: &'a dyn KillRegistry,
    pub audit: &'a dyn AuditSink,
}

impl<'a> IssuanceOrchestrator<'a> {
    /// Issue a new mandate for `agent_id` given a raw (unsanitised) `context`
    /// (§4.4 steps 1-9).
    #[instrument(skip(self, raw_context))]
    pub async fn issue(&self, agent_id: &AgentId, raw_context: Context) -> Result<Mandate> {
        let agent = self.agent_store.get(agent_id).await?;
        if !agent.is_active() {
            return Err(ReaperError::AgentInactive { agent_id: agent_id.clone() });
        }
        if self.kill_registry.is_killed(agent_id).await {
            return Err(ReaperError::AgentKilled { agent_id: agent_id.clone() });
        }

        let sanitized = context::sanitize(raw_context)?;

        let matched = evaluator::evaluate(
            agent_id,
            &sanitized,
            self.agent_store,
            self.rule_store,
            self.policy_store,
        )
        .await?;

        let policies: Vec<_> = matched.iter().map(|m| m.policy.clone()).collect();
        let authority = composer::compose(&policies)?;

        let matched_rules: Vec<RuleRef> = matched.iter().map(|m| RuleRef::from(&m.rule)).collect();
        let applied_policies: Vec<PolicyRef> =
            matched.iter().map(|m| PolicyRef::from(&m.policy)).collect();

        let now = Utc::now();
        let mandate = Mandate::new(
            agent_id.clone(),
            sanitized.clone(),
            authority,
            matched_rules.clone(),
            applied_policies.clone(),
            now,
        );
        self.mandate_store.insert(mandate.clone()).await?;

        let audit_entry = AuditEntry {
            agent_id: agent_id.clone(),
            action_id: mandate.id.clone(),
            timestamp: now,
            action_type: reaper_core::ActionType::MandateIssued,
            tool_name: None,
            mandate_id: Some(mandate.id.clone()),
            decision: AuditDecision::Allow,
            reason: "mandate issued".to_string(),
            block_code: None,
            estimated_cost: None,
            actual_cost: None,
            cumulative_cost: None,
            context: Some(sanitized),
            matched_rules,
            applied_policies,
            metadata: serde_json::Value::Null,
        };
        self.audit.append(audit_entry).await?;

        Ok(mandate)
    }

    pub async fn find_one(&self, mandate_id: &str) -> Result<Mandate> {
        self.mandate_store.find_one(&mandate_id.to_string()).await
    }

    pub async fn find_by_agent_and_context(
        &self,
        agent_id: &AgentId,
        context: &Context,
    ) -> Result<Option<Mandate>> {
        self.mandate_store.find_by_agent_and_context(agent_id, context).await
    }
}
