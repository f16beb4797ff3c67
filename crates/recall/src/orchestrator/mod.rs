//! Memory orchestration: retrieval fan-out, write-back, and conversation
//! lifecycle

pub mod conversation;
pub mod coordinator;
pub mod registry;
pub mod writeback;

use std::sync::Arc;

use crate::error::Result;
use crate::memory::types::{MemoryRecord, MemoryTier};
use crate::store::{MemoryStore, RuleStore};

pub use conversation::{ConversationManager, TurnOutcome};
pub use coordinator::RetrievalCoordinator;
pub use registry::ConversationRegistry;
pub use writeback::{NoopRulePolicy, RulePolicy, WriteBackPipeline, WriteBackReport};

/// The three tier clients plus the administrative passthrough surface
///
/// Inbound handlers address tiers by name; procedural replies are mapped into
/// records so the surface stays uniform across tiers.
#[derive(Clone)]
pub struct MemoryTiers {
    episodic: Arc<dyn MemoryStore>,
    semantic: Arc<dyn MemoryStore>,
    procedural: Arc<dyn RuleStore>,
}

impl MemoryTiers {
    /// Bundle the three tier clients
    pub fn new(
        episodic: Arc<dyn MemoryStore>,
        semantic: Arc<dyn MemoryStore>,
        procedural: Arc<dyn RuleStore>,
    ) -> Self {
        Self {
            episodic,
            semantic,
            procedural,
        }
    }

    /// Episodic client handle
    pub fn episodic(&self) -> Arc<dyn MemoryStore> {
        Arc::clone(&self.episodic)
    }

    /// Semantic client handle
    pub fn semantic(&self) -> Arc<dyn MemoryStore> {
        Arc::clone(&self.semantic)
    }

    /// Procedural client handle
    pub fn procedural(&self) -> Arc<dyn RuleStore> {
        Arc::clone(&self.procedural)
    }

    /// Administrative retrieval passthrough for one tier
    pub async fn retrieve(
        &self,
        tier: MemoryTier,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        match tier {
            MemoryTier::Episodic => self.episodic.retrieve(query, limit).await,
            MemoryTier::Semantic => self.semantic.retrieve(query, limit).await,
            MemoryTier::Procedural => {
                let rules = self.procedural.active_rules().await?;
                Ok(rules
                    .into_iter()
                    .take(limit)
                    .map(|rule| MemoryRecord {
                        id: rule.id,
                        content: rule.text.clone(),
                        summary: rule.text,
                        score: 0.0,
                        metadata: Default::default(),
                        created_at: chrono::Utc::now(),
                    })
                    .collect())
            }
        }
    }

    /// Administrative clear passthrough for one tier
    pub async fn clear(&self, tier: MemoryTier) -> Result<u64> {
        match tier {
            MemoryTier::Episodic => self.episodic.clear().await,
            MemoryTier::Semantic => self.semantic.clear().await,
            MemoryTier::Procedural => self.procedural.clear().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::Rule;
    use crate::store::{InMemoryRuleStore, InMemoryStore};

    fn tiers() -> MemoryTiers {
        MemoryTiers::new(
            Arc::new(InMemoryStore::new(MemoryTier::Episodic)),
            Arc::new(InMemoryStore::new(MemoryTier::Semantic)),
            Arc::new(InMemoryRuleStore::with_rules(vec![
                Rule::new("first rule"),
                Rule::new("second rule"),
            ])),
        )
    }

    #[tokio::test]
    async fn test_procedural_retrieve_maps_rules_to_records() {
        let tiers = tiers();
        let records = tiers
            .retrieve(MemoryTier::Procedural, "", 10)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "first rule");
        assert_eq!(records[0].summary, "first rule");
    }

    #[tokio::test]
    async fn test_procedural_retrieve_respects_limit() {
        let tiers = tiers();
        let records = tiers.retrieve(MemoryTier::Procedural, "", 1).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_then_retrieve_returns_empty() {
        let tiers = tiers();
        tiers
            .episodic()
            .store(&MemoryRecord::new("something happened", "s"))
            .await
            .unwrap();

        let removed = tiers.clear(MemoryTier::Episodic).await.unwrap();
        assert_eq!(removed, 1);

        let records = tiers
            .retrieve(MemoryTier::Episodic, "something", 5)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_clear_procedural_removes_rules() {
        let tiers = tiers();
        assert_eq!(tiers.clear(MemoryTier::Procedural).await.unwrap(), 2);
        let records = tiers
            .retrieve(MemoryTier::Procedural, "", 10)
            .await
            .unwrap();
        assert!(records.is_empty());
    }
}
