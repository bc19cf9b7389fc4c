//! Rule evaluator (C5): given an agent and a sanitised context, produce the
//! ordered set of matched `(policy, rule)` pairs (§4.2).

use reaper_core::{AgentStore, Context, Policy, PolicyStore, ReaperError, Result, Rule, RuleStore};
use tracing::instrument;

/// One rule that matched its conditions, paired with the latest active
/// version of the policy it points to.
pub struct Matched {
    pub rule: Rule,
    pub policy: Policy,
}

/// Evaluate every active rule against `context` for `agent_id` (§4.2).
///
/// Fails closed: an inactive or missing agent, or a scoped rule naming an
/// agent that itself can't be resolved as active, is never a match.
#[instrument(skip(agent_store, rule_store, policy_store, context))]
pub async fn evaluate(
    agent_id: &str,
    context: &Context,
    agent_store: &dyn AgentStore,
    rule_store: &dyn RuleStore,
    policy_store: &dyn PolicyStore,
) -> Result<Vec<Matched>> {
    let agent = agent_store.get(&agent_id.to_string()).await?;
    if !agent.is_active() {
        return Err(ReaperError::AgentInactive { agent_id: agent_id.to_string() });
    }

    let active_rules = rule_store.list_active().await?;
    let mut matched = Vec::new();

    for rule in active_rules {
        if !rule.is_universal_scope() {
            if !rule.agent_ids.iter().any(|id| id == agent_id) {
                continue;
            }
            let mut scope_ok = true;
            for scoped_id in &rule.agent_ids {
                match agent_store.get(scoped_id).await {
                    Ok(a) if a.is_active() => {}
                    _ => {
                        scope_ok = false;
                        break;
                    }
                }
            }
            if !scope_ok {
                continue;
            }
        }

        if !rule.matches_context(context) {
            continue;
        }

        match policy_store.get_latest_active(&rule.target_policy_id).await {
            Ok(policy) => matched.push(Matched { rule, policy }),
            Err(_) => continue,
        }
    }

    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_store::InMemoryAgentStore;
    use crate::policy_store::InMemoryPolicyStore;
    use crate::rule_store::InMemoryRuleStore;
    use reaper_core::{Authority, Condition, Environment, MatchMode, NewAgent, NewPolicy, NewRule, Operator};

    async fn setup_agent(agents: &InMemoryAgentStore) -> String {
        let (agent, _) = agents
            .create(NewAgent {
                name: "a".into(),
                owning_principal: "team".into(),
                environment: Environment::Development,
                metadata: Default::default(),
            })
            .await
            .unwrap();
        agent.id
    }

    #[tokio::test]
    async fn matches_universal_scope_rule_and_resolves_its_policy() {
        let agents = InMemoryAgentStore::new();
        let rules = InMemoryRuleStore::new();
        let policies = InMemoryPolicyStore::new();

        let agent_id = setup_agent(&agents).await;
        let policy = policies
            .insert_new(NewPolicy {
                name: "free".into(),
                description: "".into(),
                authority: Authority { max_cost_total: Some(1.0), ..Default::default() },
            })
            .await
            .unwrap();
        rules
            .insert_new(NewRule {
                conditions: vec![Condition {
                    field: "user_tier".into(),
                    operator: Operator::Eq,
                    value: "free".into(),
                }],
                match_mode: MatchMode::And,
                agent_ids: vec![],
                target_policy_id: policy.id.clone(),
            })
            .await
            .unwrap();

        let ctx: Context = [("user_tier".to_string(), "free".to_string())].into_iter().collect();
        let matched = evaluate(&agent_id, &ctx, &agents, &rules, &policies).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].policy.id, policy.id);
    }

    #[tokio::test]
    async fn inactive_agent_fails_closed() {
        let agents = InMemoryAgentStore::new();
        let rules = InMemoryRuleStore::new();
        let policies = InMemoryPolicyStore::new();
        let agent_id = setup_agent(&agents).await;
        agents.soft_delete(&agent_id).await.unwrap();

        let err = evaluate(&agent_id, &Context::new(), &agents, &rules, &policies).await;
        assert!(matches!(err, Err(ReaperError::AgentInactive { .. })));
    }

    #[tokio::test]
    async fn scoped_rule_only_matches_listed_agents() {
        let agents = InMemoryAgentStore::new();
        let rules = InMemoryRuleStore::new();
        let policies = InMemoryPolicyStore::new();
        let agent_id = setup_agent(&agents).await;
        let other_agent_id = setup_agent(&agents).await;

        let policy = policies
            .insert_new(NewPolicy {
                name: "scoped".into(),
                description: "".into(),
                authority: Authority::default(),
            })
            .await
            .unwrap();
        rules
            .insert_new(NewRule {
                conditions: vec![],
                match_mode: MatchMode::And,
                agent_ids: vec![other_agent_id],
                target_policy_id: policy.id.clone(),
            })
            .await
            .unwrap();

        let matched = evaluate(&agent_id, &Context::new(), &agents, &rules, &policies).await.unwrap();
        assert!(matched.is_empty());
    }
}
