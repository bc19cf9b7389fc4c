//! Policy: a named, versioned authority template (§3, C4).

use serde::{Deserialize, Serialize};

use crate::authority::Authority;

pub type PolicyId = String;
pub type PolicyVersion = u64;

/// One immutable version of a policy. `(id, version)` is globally unique
/// (I1); updates never mutate an existing row, they insert `version + 1` and
/// deactivate the previous version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub version: PolicyVersion,
    pub name: String,
    pub description: String,
    pub authority: Authority,
    pub active: bool,
}

/// A `(policyId, policyVersion)` reference frozen into an issued mandate
/// (I2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRef {
    pub policy_id: PolicyId,
    pub policy_version: PolicyVersion,
}

impl From<&Policy> for PolicyRef {
    fn from(p: &Policy) -> Self {
        PolicyRef { policy_id: p.id.clone(), policy_version: p.version }
    }
}

/// Fields accepted when creating a policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPolicy {
    pub name: String,
    pub description: String,
    pub authority: Authority,
}

/// Fields accepted when updating a policy; always creates a new version
/// (§4, §6).
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub authority: Authority,
}
