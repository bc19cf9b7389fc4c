//! End-to-end mandate issuance benchmark: the platform's hottest request
//! path (§4.4), built from the same in-memory stores `reaper-platform`
//! wires together at startup.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use message_queue::InMemoryKillRegistry;
use metrics::InMemoryAuditSink;
use policy_engine::agent_store::InMemoryAgentStore;
use policy_engine::mandate_store::InMemoryMandateStore;
use policy_engine::orchestrator::IssuanceOrchestrator;
use policy_engine::policy_store::InMemoryPolicyStore;
use policy_engine::rule_store::InMemoryRuleStore;
use reaper_core::{
    AgentStore, Authority, Condition, Environment, MatchMode, NewAgent, NewPolicy, NewRule,
    Operator, PolicyStore, RuleStore,
};

fn benchmark_issue(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let agents = Arc::new(InMemoryAgentStore::new());
    let policies = InMemoryPolicyStore::new();
    let rules = InMemoryRuleStore::new();
    let mandates = InMemoryMandateStore::new();
    let kill_registry = InMemoryKillRegistry::new(agents.clone() as Arc<dyn AgentStore>);
    let audit = InMemoryAuditSink::new();

    let agent_id = rt
        .block_on(agents.create(NewAgent {
            name: "bench-agent".into(),
            owning_principal: "team".into(),
            environment: Environment::Production,
            metadata: Default::default(),
        }))
        .unwrap()
        .0
        .id;

    let policy = rt
        .block_on(policies.insert_new(NewPolicy {
            name: "bench-policy".into(),
            description: String::new(),
            authority: Authority { max_cost_total: Some(100.0), ..Default::default() },
        }))
        .unwrap();

    rt.block_on(rules.insert_new(NewRule {
        conditions: vec![Condition { field: "tier".into(), operator: Operator::Eq, value: "free".into() }],
        match_mode: MatchMode::And,
        agent_ids: vec![],
        target_policy_id: policy.id,
    }))
    .unwrap();

    let orchestrator = IssuanceOrchestrator {
        agent_store: agents.as_ref(),
        rule_store: &rules,
        policy_store: &policies,
        mandate_store: &mandates,
        kill_registry: &kill_registry,
        audit: &audit,
    };

    let context: reaper_core::Context = [("tier".to_string(), "free".to_string())].into_iter().collect();

    c.bench_function("issue_mandate_one_matching_rule", |b| {
        b.iter(|| rt.block_on(orchestrator.issue(black_box(&agent_id), black_box(context.clone()))).unwrap());
    });
}

criterion_group!(benches, benchmark_issue);
criterion_main!(benches);
