//! Rule: a context match that points to a policy (§3, C3).

use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::context::Context;
use crate::policy::PolicyId;

pub type RuleId = String;
pub type RuleVersion = u64;

/// Comparison operator applied to a context field against a literal value
/// (§3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    In,
    Contains,
    Gt,
    Lt,
    Gte,
    Lte,
}

/// One field/operator/value triple evaluated against the issuance context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    /// The literal to compare against. `In` expects this to be a
    /// comma-separated list; `Contains` treats it as a substring.
    pub value: String,
}

impl Condition {
    /// Evaluate this condition against a context. Missing context field and
    /// unknown/unparsable numeric comparisons both evaluate to `false`
    /// (fail-closed, §4.2 step 4).
    pub fn evaluate(&self, context: &Context) -> bool {
        let Some(actual) = context.get(&self.field) else {
            return false;
        };
        match self.operator {
            Operator::Eq => actual == &self.value,
            Operator::Ne => actual != &self.value,
            Operator::In => self.value.split(',').map(str::trim).any(|v| v == actual),
            Operator::Contains => actual.contains(&self.value),
            Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte => {
                let (Ok(a), Ok(b)) = (actual.parse::<f64>(), self.value.parse::<f64>()) else {
                    return false;
                };
                match self.operator {
                    Operator::Gt => a > b,
                    Operator::Lt => a < b,
                    Operator::Gte => a >= b,
                    Operator::Lte => a <= b,
                    _ => unreachable!(),
                }
            }
        }
    }
}

/// How a rule's conditions combine (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchMode {
    And,
    Or,
}

/// One immutable version of a rule. `(id, version)` is globally unique (I1);
/// updates deactivate the previous version and insert a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub version: RuleVersion,
    pub conditions: Vec<Condition>,
    pub match_mode: MatchMode,
    /// Empty/`None` scope applies to every agent; otherwise the rule applies
    /// only to the listed agent IDs, and only if every listed agent resolves
    /// to an active agent (§4.2 step 3, fail-closed).
    pub agent_ids: Vec<AgentId>,
    pub target_policy_id: PolicyId,
    pub active: bool,
}

impl Rule {
    pub fn is_universal_scope(&self) -> bool {
        self.agent_ids.is_empty()
    }

    /// Evaluate this rule's conditions under its match mode.
    pub fn matches_context(&self, context: &Context) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        match self.match_mode {
            MatchMode::And => self.conditions.iter().all(|c| c.evaluate(context)),
            MatchMode::Or => self.conditions.iter().any(|c| c.evaluate(context)),
        }
    }
}

/// A `(ruleId, ruleVersion)` reference frozen into an issued mandate (I2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRef {
    pub rule_id: RuleId,
    pub rule_version: RuleVersion,
}

impl From<&Rule> for RuleRef {
    fn from(r: &Rule) -> Self {
        RuleRef { rule_id: r.id.clone(), rule_version: r.version }
    }
}

/// Fields accepted when creating a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRule {
    pub conditions: Vec<Condition>,
    pub match_mode: MatchMode,
    #[serde(default)]
    pub agent_ids: Vec<AgentId>,
    pub target_policy_id: PolicyId,
}

/// Fields accepted when updating a rule; always creates a new version.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleUpdate {
    pub conditions: Vec<Condition>,
    pub match_mode: MatchMode,
    #[serde(default)]
    pub agent_ids: Vec<AgentId>,
    pub target_policy_id: PolicyId,
}
