//! Policy Engine benchmarks: composition and pure-engine authorization, the
//! two hottest per-action paths (§4.3, §4.5).

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use policy_engine::{authorize, compose};
use reaper_core::{Action, ActionKind, Authority, CostClass, Mandate, RuntimeState};

fn sample_policies(count: usize) -> Vec<reaper_core::Policy> {
    (0..count)
        .map(|i| reaper_core::Policy {
            id: format!("policy-{i}"),
            version: 1,
            name: format!("policy-{i}"),
            description: String::new(),
            authority: Authority {
                max_cost_total: Some(10.0 + i as f64),
                allowed_tools: Some(vec!["read_*".into(), "send_email".into()]),
                denied_tools: vec!["delete_*".into()],
                ..Default::default()
            },
            active: true,
        })
        .collect()
}

fn benchmark_composition(c: &mut Criterion) {
    let policies = sample_policies(5);
    c.bench_function("compose_5_policies", |b| {
        b.iter(|| black_box(compose(&policies).unwrap()));
    });
}

fn benchmark_authorize(c: &mut Criterion) {
    let policies = sample_policies(3);
    let authority = compose(&policies).unwrap();
    let mandate = Mandate::new("agent-bench".into(), Default::default(), authority, vec![], vec![], Utc::now());
    let state = RuntimeState { cumulative_cost: 1.0, ..Default::default() };
    let action = Action {
        id: "bench-action".into(),
        kind: ActionKind::ToolCall { tool_name: "read_report".into() },
        estimated_cost: 0.1,
        cost_class: CostClass::Execution,
    };

    c.bench_function("authorize_tool_call", |b| {
        b.iter(|| black_box(authorize(&action, &mandate, &state, Utc::now())));
    });
}

criterion_group!(benches, benchmark_composition, benchmark_authorize);
criterion_main!(benches);
