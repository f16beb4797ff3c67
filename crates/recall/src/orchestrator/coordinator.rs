//! Retrieval coordinator: parallel fan-out with a shared deadline
//!
//! Produces one context bundle per turn. The three tier calls run
//! concurrently, each bounded by the configured deadline; a tier that misses
//! the deadline or errors is cancelled (dropped, not leaked) and contributes
//! an empty section marked in `degraded_tiers`. The working snapshot always
//! rides along untouched.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::memory::types::{ContextBundle, MemoryRecord, MemoryTier, Rule, Turn};
use crate::store::{MemoryStore, RuleStore};

/// Fans out concurrent retrieval to the three long-term tiers
pub struct RetrievalCoordinator {
    episodic: Arc<dyn MemoryStore>,
    semantic: Arc<dyn MemoryStore>,
    procedural: Arc<dyn RuleStore>,
    config: RetrievalConfig,
}

impl RetrievalCoordinator {
    /// Create a coordinator over the three tier clients
    pub fn new(
        episodic: Arc<dyn MemoryStore>,
        semantic: Arc<dyn MemoryStore>,
        procedural: Arc<dyn RuleStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            episodic,
            semantic,
            procedural,
            config,
        }
    }

    /// Assemble the context bundle for one turn
    ///
    /// Never fails: a missing memory tier must not block a turn.
    pub async fn assemble(&self, working: Vec<Turn>, query: &str) -> ContextBundle {
        let deadline = Duration::from_millis(self.config.deadline_ms);

        let (episodic, semantic, procedural) = tokio::join!(
            timeout(
                deadline,
                self.episodic.retrieve(query, self.config.episodic_limit)
            ),
            timeout(
                deadline,
                self.semantic.retrieve(query, self.config.semantic_limit)
            ),
            timeout(deadline, self.procedural.active_rules()),
        );

        let mut bundle = ContextBundle::with_working(working);

        bundle.episodic = merge_records(
            MemoryTier::Episodic,
            episodic,
            self.config.episodic_limit,
            &mut bundle.degraded_tiers,
        );
        bundle.semantic = merge_records(
            MemoryTier::Semantic,
            semantic,
            self.config.semantic_limit,
            &mut bundle.degraded_tiers,
        );
        bundle.procedural = merge_rules(procedural, &mut bundle.degraded_tiers);

        bundle
    }
}

/// Fold one similarity tier's outcome into the bundle
///
/// Descending score with a stable sort, so equal scores keep the order the
/// store returned; truncates if the store over-returned.
fn merge_records(
    tier: MemoryTier,
    outcome: std::result::Result<Result<Vec<MemoryRecord>>, tokio::time::error::Elapsed>,
    limit: usize,
    degraded: &mut Vec<MemoryTier>,
) -> Vec<MemoryRecord> {
    match outcome {
        Ok(Ok(mut records)) => {
            records.sort_by(|a, b| b.score.total_cmp(&a.score));
            records.truncate(limit);
            records
        }
        Ok(Err(e)) => {
            warn!(tier = %tier, "retrieval failed, degrading to empty: {e}");
            degraded.push(tier);
            Vec::new()
        }
        Err(_) => {
            warn!(tier = %tier, "retrieval missed deadline, degrading to empty");
            degraded.push(tier);
            Vec::new()
        }
    }
}

fn merge_rules(
    outcome: std::result::Result<Result<Vec<Rule>>, tokio::time::error::Elapsed>,
    degraded: &mut Vec<MemoryTier>,
) -> Vec<Rule> {
    match outcome {
        Ok(Ok(rules)) => rules,
        Ok(Err(e)) => {
            warn!(tier = %MemoryTier::Procedural, "retrieval failed, degrading to empty: {e}");
            degraded.push(MemoryTier::Procedural);
            Vec::new()
        }
        Err(_) => {
            warn!(tier = %MemoryTier::Procedural, "retrieval missed deadline, degrading to empty");
            degraded.push(MemoryTier::Procedural);
            Vec::new()
        }
    }
}
