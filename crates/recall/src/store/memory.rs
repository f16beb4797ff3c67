//! In-process memory store backends
//!
//! Keyword-overlap scoring stands in for the external similarity service in
//! tests and in `chat --local` mode. Scores are the fraction of query terms
//! present in a record, so results behave like the real tiers: descending
//! relevance, stable order on ties, fewer results than the limit when the
//! store has little to say.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::memory::types::{MemoryRecord, MemoryTier, Rule};
use crate::store::{MemoryStore, RuleStore};

/// Process-local similarity store for one tier
pub struct InMemoryStore {
    tier: MemoryTier,
    records: RwLock<Vec<MemoryRecord>>,
}

impl InMemoryStore {
    /// Create an empty store for `tier`
    pub fn new(tier: MemoryTier) -> Self {
        Self {
            tier,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.records.read().expect("store lock poisoned").len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<MemoryRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let records = self.records.read().expect("store lock poisoned");
        let mut scored: Vec<MemoryRecord> = records
            .iter()
            .filter_map(|record| {
                let score = keyword_overlap(query, &record.content);
                if score > 0.0 {
                    let mut hit = record.clone();
                    hit.score = score;
                    Some(hit)
                } else {
                    None
                }
            })
            .collect();

        // Stable sort keeps insertion order on equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn store(&self, record: &MemoryRecord) -> Result<Uuid> {
        let mut records = self.records.write().expect("store lock poisoned");
        records.push(record.clone());
        Ok(record.id)
    }

    async fn clear(&self) -> Result<u64> {
        let mut records = self.records.write().expect("store lock poisoned");
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }

    fn tier(&self) -> MemoryTier {
        self.tier
    }
}

/// Process-local procedural rule store
pub struct InMemoryRuleStore {
    rules: RwLock<Vec<Rule>>,
}

impl InMemoryRuleStore {
    /// Create an empty rule store
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Create a store pre-seeded with rules
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn active_rules(&self) -> Result<Vec<Rule>> {
        let rules = self.rules.read().expect("rule store lock poisoned");
        Ok(rules.iter().filter(|r| r.active).cloned().collect())
    }

    async fn upsert_rule(&self, rule: &Rule) -> Result<Uuid> {
        let mut rules = self.rules.write().expect("rule store lock poisoned");
        match rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule.clone(),
            None => rules.push(rule.clone()),
        }
        Ok(rule.id)
    }

    async fn clear(&self) -> Result<u64> {
        let mut rules = self.rules.write().expect("rule store lock poisoned");
        let removed = rules.len() as u64;
        rules.clear();
        Ok(removed)
    }
}

/// Fraction of query terms found in the candidate text, case-insensitive
fn keyword_overlap(query: &str, text: &str) -> f32 {
    let query_terms: HashSet<String> = terms(query).collect();
    if query_terms.is_empty() {
        return 0.0;
    }

    let text_terms: HashSet<String> = terms(text).collect();
    let matches = query_terms.iter().filter(|t| text_terms.contains(*t)).count();
    matches as f32 / query_terms.len() as f32
}

fn terms(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}
