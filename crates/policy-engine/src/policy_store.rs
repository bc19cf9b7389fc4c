//! In-memory policy store (C4): versioned authority templates, immutable once
//! written.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use reaper_core::{
    NewPolicy, Policy, PolicyId, PolicyStore, PolicyUpdate, PolicyVersion, ReaperError, Result,
};
use tracing::instrument;

#[derive(Default)]
struct Versions(Vec<Policy>);

impl Versions {
    fn latest(&self) -> Option<&Policy> {
        self.0.last()
    }

    fn latest_active(&self) -> Option<&Policy> {
        self.0.iter().rev().find(|p| p.active)
    }
}

#[derive(Default)]
pub struct InMemoryPolicyStore {
    policies: DashMap<PolicyId, Arc<Mutex<Versions>>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    #[instrument(skip(self, new_policy))]
    async fn insert_new(&self, new_policy: NewPolicy) -> Result<Policy> {
        let id = reaper_core::id::new_policy_id();
        let policy = Policy {
            id: id.clone(),
            version: 1,
            name: new_policy.name,
            description: new_policy.description,
            authority: new_policy.authority,
            active: true,
        };
        let lane = self.policies.entry(id).or_default().clone();
        lane.lock().0.push(policy.clone());
        Ok(policy)
    }

    async fn get_latest_active(&self, id: &PolicyId) -> Result<Policy> {
        let lane = self
            .policies
            .get(id)
            .ok_or_else(|| ReaperError::PolicyNotFound { policy_id: id.clone() })?;
        let guard = lane.lock();
        guard
            .latest_active()
            .cloned()
            .ok_or_else(|| ReaperError::PolicyNotFound { policy_id: id.clone() })
    }

    async fn get_version(&self, id: &PolicyId, version: PolicyVersion) -> Result<Policy> {
        let lane = self
            .policies
            .get(id)
            .ok_or_else(|| ReaperError::PolicyNotFound { policy_id: id.clone() })?;
        let guard = lane.lock();
        guard
            .0
            .iter()
            .find(|p| p.version == version)
            .cloned()
            .ok_or_else(|| ReaperError::PolicyNotFound { policy_id: id.clone() })
    }

    async fn list_active(&self) -> Result<Vec<Policy>> {
        Ok(self
            .policies
            .iter()
            .filter_map(|entry| entry.value().lock().latest_active().cloned())
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Policy>> {
        Ok(self.policies.iter().flat_map(|entry| entry.value().lock().0.clone()).collect())
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: &PolicyId, update: PolicyUpdate) -> Result<Policy> {
        let lane = self
            .policies
            .get(id)
            .ok_or_else(|| ReaperError::PolicyNotFound { policy_id: id.clone() })?
            .clone();
        let mut guard = lane.lock();
        let prev = guard
            .latest()
            .cloned()
            .ok_or_else(|| ReaperError::PolicyNotFound { policy_id: id.clone() })?;
        if let Some(last) = guard.0.last_mut() {
            last.active = false;
        }
        let policy = Policy {
            id: id.clone(),
            version: prev.version + 1,
            name: update.name.unwrap_or(prev.name),
            description: update.description.unwrap_or(prev.description),
            authority: update.authority,
            active: true,
        };
        guard.0.push(policy.clone());
        Ok(policy)
    }

    async fn delete(&self, id: &PolicyId, version: Option<PolicyVersion>) -> Result<()> {
        let lane = self
            .policies
            .get(id)
            .ok_or_else(|| ReaperError::PolicyNotFound { policy_id: id.clone() })?;
        let mut guard = lane.lock();
        match version {
            Some(v) => {
                if let Some(p) = guard.0.iter_mut().find(|p| p.version == v) {
                    p.active = false;
                }
            }
            None => {
                for p in guard.0.iter_mut() {
                    p.active = false;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaper_core::Authority;

    fn sample() -> NewPolicy {
        NewPolicy {
            name: "free-tier".into(),
            description: "free tier policy".into(),
            authority: Authority { max_cost_total: Some(1.0), ..Default::default() },
        }
    }

    #[tokio::test]
    async fn update_creates_new_version_and_deactivates_old() {
        let store = InMemoryPolicyStore::new();
        let policy = store.insert_new(sample()).await.unwrap();

        let updated = store
            .update(
                &policy.id,
                PolicyUpdate {
                    name: None,
                    description: None,
                    authority: Authority { max_cost_total: Some(2.0), ..Default::default() },
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.name, "free-tier");

        let v1 = store.get_version(&policy.id, 1).await.unwrap();
        assert!(!v1.active);
    }

    #[tokio::test]
    async fn delete_specific_version_leaves_others_untouched() {
        let store = InMemoryPolicyStore::new();
        let policy = store.insert_new(sample()).await.unwrap();
        store
            .update(
                &policy.id,
                PolicyUpdate { name: None, description: None, authority: Authority::default() },
            )
            .await
            .unwrap();
        store.delete(&policy.id, Some(1)).await.unwrap();
        let v1 = store.get_version(&policy.id, 1).await.unwrap();
        assert!(!v1.active);
        let v2 = store.get_version(&policy.id, 2).await.unwrap();
        assert!(v2.active, "deleting version 1 explicitly must not touch version 2");
    }
}
