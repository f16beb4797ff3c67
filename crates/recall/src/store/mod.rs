//! Memory store clients for the long-term tiers
//!
//! Each tier (episodic, semantic, procedural) sits behind a uniform async
//! interface to an external store. Retrieval may legitimately return fewer
//! matches than requested; write failures always propagate, since losing a
//! write silently corrupts long-term memory.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::memory::types::{MemoryRecord, MemoryTier, Rule};

pub use http::{HttpMemoryStore, HttpRuleStore};
pub use memory::{InMemoryRuleStore, InMemoryStore};

/// Uniform async interface to a similarity-search memory tier
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Retrieve up to `limit` records matching `query`, descending relevance
    ///
    /// Fewer matches than `limit` (including none) is not an error.
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<MemoryRecord>>;

    /// Persist a new record, returning its id
    async fn store(&self, record: &MemoryRecord) -> Result<Uuid>;

    /// Delete all records in this tier, returning the count removed
    async fn clear(&self) -> Result<u64>;

    /// Which tier this client serves
    fn tier(&self) -> MemoryTier;
}

/// Async interface to the procedural rule store
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All currently active rules
    async fn active_rules(&self) -> Result<Vec<Rule>>;

    /// Insert or revise a rule, returning its id
    async fn upsert_rule(&self, rule: &Rule) -> Result<Uuid>;

    /// Delete all rules, returning the count removed
    async fn clear(&self) -> Result<u64>;
}
