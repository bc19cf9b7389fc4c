//! In-memory mandate store (C7): issued mandates keyed by ID, with a
//! read-through lookup by agent + context for cache-style reuse (§4.4).

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use reaper_core::{AgentId, Context, Mandate, MandateId, MandateStore, ReaperError, Result};

#[derive(Default)]
pub struct InMemoryMandateStore {
    mandates: DashMap<MandateId, Mandate>,
}

impl InMemoryMandateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MandateStore for InMemoryMandateStore {
    async fn insert(&self, mandate: Mandate) -> Result<()> {
        self.mandates.insert(mandate.id.clone(), mandate);
        Ok(())
    }

    async fn find_one(&self, id: &MandateId) -> Result<Mandate> {
        let mandate = self
            .mandates
            .get(id)
            .ok_or_else(|| ReaperError::MandateNotFound { mandate_id: id.clone() })?;
        if mandate.is_expired_at(Utc::now()) {
            return Err(ReaperError::MandateNotFound { mandate_id: id.clone() });
        }
        Ok(mandate.clone())
    }

    async fn find_by_agent_and_context(
        &self,
        agent_id: &AgentId,
        context: &Context,
    ) -> Result<Option<Mandate>> {
        let now = Utc::now();
        let mut candidates: Vec<Mandate> = self
            .mandates
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|m| &m.agent_id == agent_id && !m.is_expired_at(now) && m.context_equals(context))
            .collect();
        candidates.sort_by_key(|m| std::cmp::Reverse(m.issued_at));
        Ok(candidates.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaper_core::Authority;

    fn mandate(agent_id: &str, context: Context) -> Mandate {
        Mandate::new(agent_id.to_string(), context, Authority::default(), vec![], vec![], Utc::now())
    }

    #[tokio::test]
    async fn find_one_returns_not_found_after_expiry() {
        let store = InMemoryMandateStore::new();
        let mut m = mandate("agent-a", Context::new());
        m.expires_at = Utc::now() - chrono::Duration::seconds(1);
        let id = m.id.clone();
        store.insert(m).await.unwrap();
        assert!(store.find_one(&id).await.is_err());
    }

    #[tokio::test]
    async fn find_by_agent_and_context_requires_exact_match() {
        let store = InMemoryMandateStore::new();
        let ctx: Context = [("user_tier".to_string(), "free".to_string())].into_iter().collect();
        let m = mandate("agent-a", ctx.clone());
        store.insert(m.clone()).await.unwrap();

        let found = store.find_by_agent_and_context(&"agent-a".to_string(), &ctx).await.unwrap();
        assert_eq!(found.unwrap().id, m.id);

        let other: Context = [("user_tier".to_string(), "paid".to_string())].into_iter().collect();
        let not_found =
            store.find_by_agent_and_context(&"agent-a".to_string(), &other).await.unwrap();
        assert!(not_found.is_none());
    }
}
