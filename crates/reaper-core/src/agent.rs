//! Agent data model (§3)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type AgentId = String;

/// Deployment environment an agent is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(format!("unrecognised environment tag: {other}")),
        }
    }
}

/// Lifecycle status of an agent, independent of the kill registry (§3: killing
/// also sets status to `Inactive`, but `Inactive` can also result from a plain
/// soft-delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
}

/// An autonomous agent registered with the issuance platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// SHA-256 hex digest of the agent's API key; the cleartext key is never
    /// stored (§3, §6).
    pub api_key_hash: String,
    pub name: String,
    pub owning_principal: String,
    pub environment: Environment,
    pub status: AgentStatus,
    pub metadata: BTreeMap<String, String>,
}

impl Agent {
    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

/// Fields accepted when registering a new agent. The caller never supplies an
/// `id` or `api_key_hash` — those are minted by the server (C1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub owning_principal: String,
    pub environment: Environment,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Fields accepted when updating an existing agent. `None` leaves the field
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub owning_principal: Option<String>,
    pub environment: Option<Environment>,
    pub metadata: Option<BTreeMap<String, String>>,
}
