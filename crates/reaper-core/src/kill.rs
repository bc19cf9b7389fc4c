//! Kill entry (§3, C9): a globally visible, per-agent flag that fails every
//! enforcement check closed once it exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillEntry {
    pub agent_id: AgentId,
    pub killed_at: DateTime<Utc>,
    pub reason: String,
    pub killed_by: String,
}

/// Shape returned by `GET /agents/:id/kill-status` (§6).
#[derive(Debug, Clone, Serialize)]
pub struct KillStatus {
    pub is_killed: bool,
    pub killed_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub killed_by: Option<String>,
}

impl From<Option<KillEntry>> for KillStatus {
    fn from(entry: Option<KillEntry>) -> Self {
        match entry {
            Some(e) => KillStatus {
                is_killed: true,
                killed_at: Some(e.killed_at),
                reason: Some(e.reason),
                killed_by: Some(e.killed_by),
            },
            None => KillStatus { is_killed: false, killed_at: None, reason: None, killed_by: None },
        }
    }
}
