//! Process-wide conversation registry
//!
//! One conversation manager per conversation id, held in a concurrent map
//! rather than process-wide globals. Entries appear when a handler registers
//! a started conversation and may be evicted after end plus a retention
//! window.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::orchestrator::conversation::ConversationManager;

/// Registry of live conversation managers keyed by external session id
#[derive(Default)]
pub struct ConversationRegistry {
    managers: DashMap<String, Arc<ConversationManager>>,
}

impl ConversationRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            managers: DashMap::new(),
        }
    }

    /// Register a manager under `session_id`, returning the previous entry
    pub fn insert(
        &self,
        session_id: impl Into<String>,
        manager: Arc<ConversationManager>,
    ) -> Option<Arc<ConversationManager>> {
        self.managers.insert(session_id.into(), manager)
    }

    /// Look up the manager for `session_id`
    pub fn get(&self, session_id: &str) -> Option<Arc<ConversationManager>> {
        self.managers.get(session_id).map(|entry| Arc::clone(&entry))
    }

    /// Remove and return the manager for `session_id`
    pub fn remove(&self, session_id: &str) -> Option<Arc<ConversationManager>> {
        self.managers.remove(session_id).map(|(_, manager)| manager)
    }

    /// Number of registered conversations
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Evict conversations that ended before `cutoff`, returning the count
    pub fn evict_ended_before(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.managers.len();
        self.managers.retain(|session_id, manager| {
            match manager.ended_at() {
                Some(ended_at) if ended_at < cutoff => {
                    debug!(session_id, %ended_at, "evicting ended conversation");
                    false
                }
                _ => true,
            }
        });
        before - self.managers.len()
    }
}
