//! Performance benchmarks for Reaper Core's pure, hot-path components.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reaper_core::glob;
use reaper_core::{Condition, MatchMode, Operator, Rule};

fn benchmark_glob_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("reaper_glob_matching");

    let patterns = vec![
        "send_email".to_string(),
        "read_*".to_string(),
        "*_internal".to_string(),
        "*".to_string(),
    ];

    for size in [1, 10, 100].iter() {
        let denied: Vec<String> = (0..*size).map(|i| format!("tool_{i}_*")).collect();
        group.bench_with_input(BenchmarkId::new("matches_any", size), size, |b, _| {
            b.iter(|| black_box(glob::matches_any(&denied, "tool_5_call")));
        });
        let _ = &patterns;
    }

    group.finish();
}

fn benchmark_rule_matching(c: &mut Criterion) {
    let context: reaper_core::Context =
        [("user_tier".to_string(), "free".to_string()), ("region".to_string(), "us-east-1".to_string())]
            .into_iter()
            .collect();

    let rule = Rule {
        id: "rule-bench".into(),
        version: 1,
        conditions: vec![
            Condition { field: "user_tier".into(), operator: Operator::Eq, value: "free".into() },
            Condition { field: "region".into(), operator: Operator::In, value: "us-east-1,us-west-2".into() },
        ],
        match_mode: MatchMode::And,
        agent_ids: vec![],
        target_policy_id: "policy-bench".into(),
        active: true,
    };

    c.bench_function("rule_matches_context", |b| {
        b.iter(|| black_box(rule.matches_context(&context)));
    });
}

criterion_group!(benches, benchmark_glob_matching, benchmark_rule_matching);
criterion_main!(benches);
