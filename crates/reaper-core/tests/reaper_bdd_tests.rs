//! BDD tests for pure rule matching (reaper-core has no store of its own).

use cucumber::{given, then, when, World};
use reaper_core::*;

#[derive(Debug, World)]
#[world(init = Self::new)]
struct ReaperWorld {
    rule: Option<Rule>,
    matched: Option<bool>,
}

impl ReaperWorld {
    fn new() -> Self {
        Self { rule: None, matched: None }
    }
}

fn parse_context(raw: &str) -> Context {
    raw.split(',')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[given(regex = r#"^a rule requiring "([^"]+)" equals "([^"]+)" AND "([^"]+)" in "([^"]+)"$"#)]
async fn given_and_rule(world: &mut ReaperWorld, field_a: String, value_a: String, field_b: String, value_b: String) {
    world.rule = Some(Rule {
        id: "rule-test".into(),
        version: 1,
        conditions: vec![
            Condition { field: field_a, operator: Operator::Eq, value: value_a },
            Condition { field: field_b, operator: Operator::In, value: value_b },
        ],
        match_mode: MatchMode::And,
        agent_ids: vec![],
        target_policy_id: "policy-test".into(),
        active: true,
    });
}

#[given(regex = r#"^an OR rule requiring "([^"]+)" equals "([^"]+)" or "([^"]+)" equals "([^"]+)"$"#)]
async fn given_or_rule(world: &mut ReaperWorld, field_a: String, value_a: String, field_b: String, value_b: String) {
    world.rule = Some(Rule {
        id: "rule-test-or".into(),
        version: 1,
        conditions: vec![
            Condition { field: field_a, operator: Operator::Eq, value: value_a },
            Condition { field: field_b, operator: Operator::Eq, value: value_b },
        ],
        match_mode: MatchMode::Or,
        agent_ids: vec![],
        target_policy_id: "policy-test".into(),
        active: true,
    });
}

#[when(regex = r#"^I match context "([^"]*)"$"#)]
async fn when_match_context(world: &mut ReaperWorld, raw_context: String) {
    let context = parse_context(&raw_context);
    let rule = world.rule.as_ref().expect("rule not set up");
    world.matched = Some(rule.matches_context(&context));
}

#[then("the rule should match")]
async fn then_should_match(world: &mut ReaperWorld) {
    assert_eq!(world.matched, Some(true));
}

#[then("the rule should not match")]
async fn then_should_not_match(world: &mut ReaperWorld) {
    assert_eq!(world.matched, Some(false));
}

#[tokio::main]
async fn main() {
    ReaperWorld::run("tests/features").await;
}
