//! Mandate: a time-bounded, immutable record of the authority granted for a
//! specific context (§3, C7).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::authority::Authority;
use crate::context::Context;
use crate::policy::PolicyRef;
use crate::rule::RuleRef;

pub type MandateId = String;

/// Mandates are live for five minutes from issuance (§3).
pub const MANDATE_TTL_SECONDS: i64 = 300;

/// Current mandate schema version, carried on every issued mandate so a
/// future schema change can be detected by old runtime libraries.
pub const MANDATE_SCHEMA_VERSION: u32 = 1;

/// A historical fact: once written, a mandate never mutates (§3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mandate {
    pub id: MandateId,
    pub agent_id: AgentId,
    pub context: Context,
    pub authority: Authority,
    pub matched_rules: Vec<RuleRef>,
    pub applied_policies: Vec<PolicyRef>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub schema_version: u32,
}

impl Mandate {
    pub fn new(
        agent_id: AgentId,
        context: Context,
        authority: Authority,
        matched_rules: Vec<RuleRef>,
        applied_policies: Vec<PolicyRef>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Mandate {
            id: crate::id::new_mandate_id(),
            agent_id,
            context,
            authority,
            matched_rules,
            applied_policies,
            issued_at,
            expires_at: issued_at + Duration::seconds(MANDATE_TTL_SECONDS),
            schema_version: MANDATE_SCHEMA_VERSION,
        }
    }

    /// Mandates past `expires_at` are treated as not-found by every reader
    /// (§3, §4.4, scenario 6).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Does this mandate's stored context match the given context by key-set
    /// and value equality (§4.4 `findByAgentAndContext`)?
    pub fn context_equals(&self, other: &Context) -> bool {
        &self.context == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_at_is_five_minutes_after_issuance() {
        let now = Utc::now();
        let m = Mandate::new(
            "agent-x".into(),
            Context::new(),
            Authority::default(),
            vec![],
            vec![],
            now,
        );
        assert_eq!((m.expires_at - m.issued_at).num_seconds(), 300);
    }

    #[test]
    fn expiry_check_is_strictly_after() {
        let now = Utc::now();
        let m = Mandate::new(
            "agent-x".into(),
            Context::new(),
            Authority::default(),
            vec![],
            vec![],
            now,
        );
        assert!(!m.is_expired_at(m.expires_at));
        assert!(m.is_expired_at(m.expires_at + Duration::milliseconds(1)));
    }
}
