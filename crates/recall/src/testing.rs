//! Test utilities for Recall - shared mock collaborators
//!
//! Mock stores and a mock gateway for deterministic tests that exercise the
//! orchestrator without external services. Mocks can be configured to delay,
//! fail reads, or fail writes to drive the degraded paths.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{RecallError, Result};
use crate::gateway::CompletionGateway;
use crate::memory::types::{ContextBundle, MemoryRecord, MemoryTier, Rule};
use crate::store::{MemoryStore, RuleStore};

/// Mock similarity store with configurable records, latency, and failures
///
/// `retrieve` returns the configured records regardless of `limit`, so tests
/// can verify that callers truncate over-returning stores.
pub struct MockMemoryStore {
    tier: MemoryTier,
    records: Vec<MemoryRecord>,
    delay: Option<Duration>,
    fail_reads: bool,
    fail_writes: bool,
    stored: Mutex<Vec<MemoryRecord>>,
}

impl MockMemoryStore {
    /// Empty mock for `tier`
    pub fn new(tier: MemoryTier) -> Self {
        Self {
            tier,
            records: Vec::new(),
            delay: None,
            fail_reads: false,
            fail_writes: false,
            stored: Mutex::new(Vec::new()),
        }
    }

    /// Records returned by every `retrieve`
    pub fn with_records(mut self, records: Vec<MemoryRecord>) -> Self {
        self.records = records;
        self
    }

    /// Sleep this long before serving any call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make `retrieve` fail
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Make `store` fail
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Records written through `store` so far
    pub fn stored_records(&self) -> Vec<MemoryRecord> {
        self.stored.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl MemoryStore for MockMemoryStore {
    async fn retrieve(&self, _query: &str, _limit: usize) -> Result<Vec<MemoryRecord>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads {
            return Err(RecallError::Store(format!("{} tier down", self.tier)));
        }
        Ok(self.records.clone())
    }

    async fn store(&self, record: &MemoryRecord) -> Result<Uuid> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes {
            return Err(RecallError::Store(format!("{} tier down", self.tier)));
        }
        self.stored
            .lock()
            .expect("mock lock poisoned")
            .push(record.clone());
        Ok(record.id)
    }

    async fn clear(&self) -> Result<u64> {
        let mut stored = self.stored.lock().expect("mock lock poisoned");
        let removed = stored.len() as u64;
        stored.clear();
        Ok(removed)
    }

    fn tier(&self) -> MemoryTier {
        self.tier
    }
}

/// Mock rule store with configurable rules, latency, and failures
pub struct MockRuleStore {
    rules: Vec<Rule>,
    delay: Option<Duration>,
    fail_reads: bool,
    fail_writes: bool,
    upserted: Mutex<Vec<Rule>>,
}

impl MockRuleStore {
    /// Empty mock rule store
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            delay: None,
            fail_reads: false,
            fail_writes: false,
            upserted: Mutex::new(Vec::new()),
        }
    }

    /// Rules returned by every `active_rules`
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    /// Sleep this long before serving any call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make `active_rules` fail
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Make `upsert_rule` fail
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Rules upserted so far
    pub fn upserted_rules(&self) -> Vec<Rule> {
        self.upserted.lock().expect("mock lock poisoned").clone()
    }
}

impl Default for MockRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for MockRuleStore {
    async fn active_rules(&self) -> Result<Vec<Rule>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads {
            return Err(RecallError::Store("procedural tier down".to_string()));
        }
        Ok(self.rules.clone())
    }

    async fn upsert_rule(&self, rule: &Rule) -> Result<Uuid> {
        if self.fail_writes {
            return Err(RecallError::Store("procedural tier down".to_string()));
        }
        self.upserted
            .lock()
            .expect("mock lock poisoned")
            .push(rule.clone());
        Ok(rule.id)
    }

    async fn clear(&self) -> Result<u64> {
        let mut upserted = self.upserted.lock().expect("mock lock poisoned");
        let removed = upserted.len() as u64;
        upserted.clear();
        Ok(removed)
    }
}

/// Mock completion gateway returning a canned response
pub struct MockGateway {
    response: String,
    fail: bool,
    bundles: Mutex<Vec<ContextBundle>>,
    user_messages: Mutex<Vec<String>>,
}

impl MockGateway {
    /// Gateway that always answers with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            fail: false,
            bundles: Mutex::new(Vec::new()),
            user_messages: Mutex::new(Vec::new()),
        }
    }

    /// Gateway that always fails
    pub fn failing() -> Self {
        Self {
            response: String::new(),
            fail: true,
            bundles: Mutex::new(Vec::new()),
            user_messages: Mutex::new(Vec::new()),
        }
    }

    /// Bundles seen by `generate` so far
    pub fn seen_bundles(&self) -> Vec<ContextBundle> {
        self.bundles.lock().expect("mock lock poisoned").clone()
    }

    /// User messages seen by `generate` so far
    pub fn seen_messages(&self) -> Vec<String> {
        self.user_messages
            .lock()
            .expect("mock lock poisoned")
            .clone()
    }
}

#[async_trait]
impl CompletionGateway for MockGateway {
    async fn generate(&self, bundle: &ContextBundle, user_message: &str) -> Result<String> {
        if self.fail {
            return Err(RecallError::Generation("provider unavailable".to_string()));
        }
        self.bundles
            .lock()
            .expect("mock lock poisoned")
            .push(bundle.clone());
        self.user_messages
            .lock()
            .expect("mock lock poisoned")
            .push(user_message.to_string());
        Ok(self.response.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
