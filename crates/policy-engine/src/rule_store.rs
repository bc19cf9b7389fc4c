//! In-memory rule store (C3): versioned conditions-to-policy mappings.
//!
//! Satisfies [`reaper_core::RuleStore`]; the workspace carries no SQL driver,
//! so update semantics that a transactional store would get from `FOR UPDATE`
//! are reproduced here with a `parking_lot::Mutex` per rule ID.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use reaper_core::{NewRule, ReaperError, Result, Rule, RuleId, RuleStore, RuleUpdate, RuleVersion};
use tracing::instrument;

/// All versions ever written for one rule ID, newest last.
#[derive(Default)]
struct Versions(Vec<Rule>);

impl Versions {
    fn latest(&self) -> Option<&Rule> {
        self.0.last()
    }

    fn latest_active(&self) -> Option<&Rule> {
        self.0.iter().rev().find(|r| r.active)
    }
}

/// Lock-free map of rule ID to its version history, each history guarded by
/// its own mutex so concurrent updates to different rules never contend.
#[derive(Default)]
pub struct InMemoryRuleStore {
    rules: DashMap<RuleId, Arc<Mutex<Versions>>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    #[instrument(skip(self, new_rule))]
    async fn insert_new(&self, new_rule: NewRule) -> Result<Rule> {
        let id = reaper_core::id::new_rule_id();
        let rule = Rule {
            id: id.clone(),
            version: 1,
            conditions: new_rule.conditions,
            match_mode: new_rule.match_mode,
            agent_ids: new_rule.agent_ids,
            target_policy_id: new_rule.target_policy_id,
            active: true,
        };
        let lane = self.rules.entry(id).or_default().clone();
        lane.lock().0.push(rule.clone());
        Ok(rule)
    }

    async fn get_latest(&self, id: &RuleId) -> Result<Rule> {
        let lane = self
            .rules
            .get(id)
            .ok_or_else(|| ReaperError::RuleNotFound { rule_id: id.clone() })?;
        let guard = lane.lock();
        guard
            .latest()
            .cloned()
            .ok_or_else(|| ReaperError::RuleNotFound { rule_id: id.clone() })
    }

    async fn get_version(&self, id: &RuleId, version: RuleVersion) -> Result<Rule> {
        let lane = self
            .rules
            .get(id)
            .ok_or_else(|| ReaperError::RuleNotFound { rule_id: id.clone() })?;
        let guard = lane.lock();
        guard
            .0
            .iter()
            .find(|r| r.version == version)
            .cloned()
            .ok_or_else(|| ReaperError::RuleNotFound { rule_id: id.clone() })
    }

    async fn list_active(&self) -> Result<Vec<Rule>> {
        let mut out: Vec<Rule> = self
            .rules
            .iter()
            .filter_map(|entry| entry.value().lock().latest_active().cloned())
            .collect();
        // Stable tiebreaker for reproducible evaluation order (§4.2 step 6).
        out.sort_by(|a, b| b.version.cmp(&a.version).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn list_all(&self) -> Result<Vec<Rule>> {
        let mut out: Vec<Rule> =
            self.rules.iter().flat_map(|entry| entry.value().lock().0.clone()).collect();
        out.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.version.cmp(&b.version)));
        Ok(out)
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: &RuleId, update: RuleUpdate) -> Result<Rule> {
        let lane = self
            .rules
            .get(id)
            .ok_or_else(|| ReaperError::RuleNotFound { rule_id: id.clone() })?
            .clone();
        let mut guard = lane.lock();
        let next_version = guard.latest().map(|r| r.version + 1).unwrap_or(1);
        if let Some(prev) = guard.0.last_mut() {
            prev.active = false;
        }
        let rule = Rule {
            id: id.clone(),
            version: next_version,
            conditions: update.conditions,
            match_mode: update.match_mode,
            agent_ids: update.agent_ids,
            target_policy_id: update.target_policy_id,
            active: true,
        };
        guard.0.push(rule.clone());
        Ok(rule)
    }

    async fn delete(&self, id: &RuleId) -> Result<()> {
        let lane = self
            .rules
            .get(id)
            .ok_or_else(|| ReaperError::RuleNotFound { rule_id: id.clone() })?;
        let mut guard = lane.lock();
        for r in guard.0.iter_mut() {
            r.active = false;
        }
        Ok(())
    }
}
