//! Two-phase executor (C12): authorize → execute → verify → settle → commit
//! (§4.6). The only component that drives a real side-effecting call; every
//! other stage on its path is pure or store-backed.

use std::future::Future;

use chrono::Utc;
use reaper_core::{
    Action, ActionType, Agent, AuditDecision, AuditEntry, AuditSink, ChargingPolicy, CostClass,
    Decision, Mandate, ReaperError, Result, StateChange, StateManager,
};
use tracing::{info, instrument, warn};

use crate::engine;

/// The outcome of running the caller's side-effecting closure, reported back
/// to the executor for settlement (§4.6 step 3-4).
pub struct ExecutionOutcome {
    pub success: bool,
    pub actual_cost: Option<f64>,
    pub verify_failed_reason: Option<String>,
}

impl ExecutionOutcome {
    pub fn success(actual_cost: Option<f64>) -> Self {
        ExecutionOutcome { success: true, actual_cost, verify_failed_reason: None }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        ExecutionOutcome { success: false, actual_cost: None, verify_failed_reason: Some(reason.into()) }
    }
}

pub struct TwoPhaseExecutor<'a> {
    pub state: &'a dyn StateManager,
    pub audit: &'a dyn AuditSink,
    pub charging_policy: ChargingPolicy,
}

impl<'a> TwoPhaseExecutor<'a> {
    pub fn new(state: &'a dyn StateManager, audit: &'a dyn AuditSink, charging_policy: ChargingPolicy) -> Self {
        TwoPhaseExecutor { state, audit, charging_policy }
    }

    /// Run `action` against `mandate` for `agent`, invoking `run` only if the
    /// authorize phase allows. `run` performs the actual side effect and
    /// reports whether it (and any verification) succeeded.
    #[instrument(skip(self, run), fields(agent_id = %agent.id, mandate_id = %mandate.id, action_id = %action.id))]
    pub async fn execute<F, Fut>(&self, agent: &Agent, mandate: &Mandate, action: Action, run: F) -> Result<Decision>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ExecutionOutcome>,
    {
        let now = Utc::now();
        let snapshot = self.state.get(&agent.id, &mandate.id).await;

        let decision = engine::authorize(&action, mandate, &snapshot, now);
        if let Decision::Block { reason, code } = &decision {
            self.append_audit(agent, mandate, &action, AuditDecision::Block, reason.clone(), Some(*code), None, None, snapshot.cumulative_cost)
                .await;
            return Err(ReaperError::blocked(*code, reason.clone()));
        }

        let outcome = run().await;

        let settled_cost = self.charging_policy.settle(action.estimated_cost, outcome.actual_cost, outcome.success);

        let change = StateChange {
            action_id: action.id.clone(),
            settled_cost,
            cost_class: action.cost_class,
            tool_name: action.tool_name().map(str::to_string),
            idempotency_key: None,
        };

        match self.state.check_and_commit(&agent.id, &mandate.id, &mandate.authority, change).await {
            Ok(new_state) => {
                let reason = if outcome.success {
                    "executed and settled".to_string()
                } else {
                    outcome
                        .verify_failed_reason
                        .clone()
                        .unwrap_or_else(|| "execution failed, zero cost settled".to_string())
                };
                self.append_audit(
                    agent,
                    mandate,
                    &action,
                    AuditDecision::Allow,
                    reason,
                    None,
                    Some(action.estimated_cost),
                    Some(settled_cost),
                    new_state.cumulative_cost,
                )
                .await;
                Ok(Decision::allow(
                    "executed",
                    mandate.authority.max_cost_total.map(|m| m - new_state.cumulative_cost),
                ))
            }
            Err(rejection) => {
                // The side effect already ran; the system refuses to account
                // it as consumed authority (§4.6 step 5).
                warn!(?rejection, "settlement refused after execution");
                let code = rejection.as_block_code();
                let reason = format!("settlement refused after execution: {rejection:?}");
                self.append_audit(
                    agent,
                    mandate,
                    &action,
                    AuditDecision::Block,
                    reason.clone(),
                    code,
                    Some(action.estimated_cost),
                    Some(settled_cost),
                    snapshot.cumulative_cost,
                )
                .await;
                Err(ReaperError::InconsistentSettlement { reason })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn append_audit(
        &self,
        agent: &Agent,
        mandate: &Mandate,
        action: &Action,
        decision: AuditDecision,
        reason: String,
        block_code: Option<reaper_core::BlockCode>,
        estimated_cost: Option<f64>,
        actual_cost: Option<f64>,
        cumulative_cost: f64,
    ) {
        let action_type = match &action.kind {
            reaper_core::ActionKind::ToolCall { .. } => ActionType::ToolCall,
            reaper_core::ActionKind::LlmCall => ActionType::LlmCall,
        };
        let entry = AuditEntry {
            agent_id: agent.id.clone(),
            action_id: action.id.clone(),
            timestamp: Utc::now(),
            action_type,
            tool_name: action.tool_name().map(str::to_string),
            mandate_id: Some(mandate.id.clone()),
            decision,
            reason,
            block_code,
            estimated_cost,
            actual_cost,
            cumulative_cost: Some(cumulative_cost),
            context: Some(mandate.context.clone()),
            matched_rules: mandate.matched_rules.clone(),
            applied_policies: mandate.applied_policies.clone(),
            metadata: serde_json::Value::Null,
        };
        if let Err(e) = self.audit.append(entry).await {
            warn!(error = %e, "failed to append audit entry");
        }
        info!(decision = ?decision_label(&decision), "action audited");
    }
}

fn decision_label(decision: &AuditDecision) -> &'static str {
    match decision {
        AuditDecision::Allow => "ALLOW",
        AuditDecision::Block => "BLOCK",
    }
}
