//! Conversation lifecycle and per-turn sequencing
//!
//! One manager owns one conversation: a state machine `idle -> active ->
//! ended` where `ended` is terminal (an explicit `reset` reinitializes to
//! `idle`). Turns are serialized by a per-conversation gate so no two
//! `process_turn` calls overlap; within a turn the retrieval fan-out is the
//! only concurrent phase.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::Mutex as TokioMutex;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{RecallError, Result};
use crate::gateway::CompletionGateway;
use crate::memory::state::{ConversationState, ConversationSummary, StatsSnapshot};
use crate::memory::types::Turn;
use crate::memory::working::WorkingBuffer;
use crate::orchestrator::coordinator::RetrievalCoordinator;
use crate::orchestrator::writeback::{RulePolicy, WriteBackPipeline};
use crate::store::{MemoryStore, RuleStore};

/// Result of one completed turn
#[derive(Debug)]
pub struct TurnOutcome {
    /// Generated response text
    pub response: String,
    /// Statistics after the turn was recorded
    pub stats: StatsSnapshot,
    /// Non-fatal write-back warnings, if any
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Active,
    Ended,
}

struct Lifecycle {
    phase: Phase,
    state: Option<ConversationState>,
    summary: Option<ConversationSummary>,
}

/// Owns one conversation: lifecycle, turn sequencing, and statistics
pub struct ConversationManager {
    buffer: Arc<WorkingBuffer>,
    coordinator: RetrievalCoordinator,
    gateway: Arc<dyn CompletionGateway>,
    writeback: WriteBackPipeline,
    lifecycle: Mutex<Lifecycle>,
    // Serializes turns and end(); never held across the lifecycle mutex
    turn_gate: TokioMutex<()>,
}

impl ConversationManager {
    /// Build a manager over the given collaborators
    pub fn new(
        config: &Config,
        episodic: Arc<dyn MemoryStore>,
        semantic: Arc<dyn MemoryStore>,
        procedural: Arc<dyn RuleStore>,
        gateway: Arc<dyn CompletionGateway>,
        rule_policy: Arc<dyn RulePolicy>,
    ) -> Self {
        let buffer = Arc::new(WorkingBuffer::new(config.working.capacity));
        let coordinator = RetrievalCoordinator::new(
            Arc::clone(&episodic),
            Arc::clone(&semantic),
            Arc::clone(&procedural),
            config.retrieval.clone(),
        );
        let writeback = WriteBackPipeline::new(
            Arc::clone(&buffer),
            episodic,
            procedural,
            rule_policy,
            config.write_back.episodic_policy,
        );

        Self {
            buffer,
            coordinator,
            gateway,
            writeback,
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Idle,
                state: None,
                summary: None,
            }),
            turn_gate: TokioMutex::new(()),
        }
    }

    /// Start the conversation: `idle -> active`
    pub fn start(&self) -> Result<Uuid> {
        let mut lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        match lifecycle.phase {
            Phase::Idle => {
                let state = ConversationState::new();
                let id = state.id;
                lifecycle.phase = Phase::Active;
                lifecycle.state = Some(state);
                info!(conversation_id = %id, "conversation started");
                Ok(id)
            }
            Phase::Active => Err(RecallError::State(
                "conversation already active".to_string(),
            )),
            Phase::Ended => Err(RecallError::State(
                "conversation already ended; reset before starting a new one".to_string(),
            )),
        }
    }

    /// Process one user message through retrieval, generation, and write-back
    pub async fn process_turn(&self, message: &str) -> Result<TurnOutcome> {
        let _turn = self.turn_gate.lock().await;

        let conversation_id = self.active_id()?;
        let started = Instant::now();

        self.buffer.append(Turn::user(message));

        let bundle = self
            .coordinator
            .assemble(self.buffer.snapshot(), message)
            .await;

        // A generation failure aborts the turn before write-back; the user
        // turn stays appended, the agent turn is never added.
        let response = self.gateway.generate(&bundle, message).await?;

        let report = self
            .writeback
            .run_turn(conversation_id, message, &response)
            .await;

        let latency_ms = started.elapsed().as_millis() as u64;
        let stats = {
            let mut lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
            let state = lifecycle
                .state
                .as_mut()
                .expect("active conversation has state");
            state.record_turn(latency_ms, report.degraded_writes);
            StatsSnapshot::from(&*state)
        };

        info!(
            conversation_id = %conversation_id,
            latency_ms,
            degraded_tiers = bundle.degraded_tiers.len(),
            degraded_writes = report.degraded_writes,
            "turn completed"
        );

        Ok(TurnOutcome {
            response,
            stats,
            warnings: report.warnings,
        })
    }

    /// End the conversation: `active -> ended`, computing the summary once
    pub async fn end(&self) -> Result<ConversationSummary> {
        let _turn = self.turn_gate.lock().await;

        let conversation_id = self.active_id().map_err(|_| {
            let lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
            match lifecycle.phase {
                Phase::Ended => RecallError::State("conversation already ended".to_string()),
                _ => RecallError::State("no active conversation".to_string()),
            }
        })?;

        let report = self.writeback.finish_conversation(conversation_id).await;

        let mut lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        let state = lifecycle
            .state
            .as_mut()
            .expect("active conversation has state");
        state.degraded_writes += report.degraded_writes;
        state.finalize();

        let summary = ConversationSummary::from_state(state);
        lifecycle.phase = Phase::Ended;
        lifecycle.summary = Some(summary.clone());

        info!(
            conversation_id = %conversation_id,
            total_messages = summary.total_messages,
            "conversation ended"
        );
        Ok(summary)
    }

    /// Reinitialize to `idle` with a cleared buffer
    pub async fn reset(&self) {
        let _turn = self.turn_gate.lock().await;
        self.buffer.clear();

        let mut lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        lifecycle.phase = Phase::Idle;
        lifecycle.state = None;
        lifecycle.summary = None;
        info!("conversation manager reset");
    }

    /// Read-only statistics snapshot; safe to call during an in-flight turn
    pub fn stats(&self) -> Result<StatsSnapshot> {
        let lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        lifecycle
            .state
            .as_ref()
            .map(StatsSnapshot::from)
            .ok_or_else(|| RecallError::State("no conversation started".to_string()))
    }

    /// The summary, once the conversation has ended
    pub fn summary(&self) -> Option<ConversationSummary> {
        let lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        lifecycle.summary.clone()
    }

    /// When the conversation ended, if it has
    pub fn ended_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        lifecycle.state.as_ref().and_then(|s| s.ended_at)
    }

    /// Number of turns currently retained in the working buffer
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    fn active_id(&self) -> Result<Uuid> {
        let lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        if lifecycle.phase != Phase::Active {
            return Err(RecallError::State("no active conversation".to_string()));
        }
        Ok(lifecycle
            .state
            .as_ref()
            .expect("active conversation has state")
            .id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::MemoryTier;
    use crate::orchestrator::writeback::NoopRulePolicy;
    use crate::testing::{MockGateway, MockMemoryStore, MockRuleStore};

    fn manager_with_gateway(gateway: Arc<dyn CompletionGateway>) -> ConversationManager {
        ConversationManager::new(
            &Config::default(),
            Arc::new(MockMemoryStore::new(MemoryTier::Episodic)),
            Arc::new(MockMemoryStore::new(MemoryTier::Semantic)),
            Arc::new(MockRuleStore::new()),
            gateway,
            Arc::new(NoopRulePolicy),
        )
    }

    fn manager() -> ConversationManager {
        manager_with_gateway(Arc::new(MockGateway::new("Sure!")))
    }

    #[test]
    fn test_start_twice_fails() {
        let manager = manager();
        manager.start().unwrap();
        let err = manager.start().unwrap_err();
        assert!(matches!(err, RecallError::State(_)));
    }

    #[tokio::test]
    async fn test_process_turn_before_start_fails() {
        let manager = manager();
        let err = manager.process_turn("hello").await.unwrap_err();
        assert!(matches!(err, RecallError::State(_)));
    }

    #[tokio::test]
    async fn test_process_turn_after_end_fails() {
        let manager = manager();
        manager.start().unwrap();
        manager.end().await.unwrap();
        let err = manager.process_turn("hello").await.unwrap_err();
        assert!(matches!(err, RecallError::State(_)));
    }

    #[tokio::test]
    async fn test_end_twice_fails_without_recomputing_summary() {
        let manager = manager();
        manager.start().unwrap();
        manager.process_turn("hello").await.unwrap();

        let summary = manager.end().await.unwrap();
        assert_eq!(summary.total_messages, 1);

        let err = manager.end().await.unwrap_err();
        assert!(matches!(err, RecallError::State(_)));

        // The stored summary is the original one
        let kept = manager.summary().unwrap();
        assert_eq!(kept.id, summary.id);
        assert_eq!(kept.total_messages, 1);
    }

    #[tokio::test]
    async fn test_start_after_end_requires_reset() {
        let manager = manager();
        manager.start().unwrap();
        manager.end().await.unwrap();

        assert!(manager.start().is_err());

        manager.reset().await;
        assert!(manager.start().is_ok());
        assert!(manager.summary().is_none());
    }

    #[tokio::test]
    async fn test_turn_updates_stats() {
        let manager = manager();
        manager.start().unwrap();

        let outcome = manager.process_turn("hello").await.unwrap();
        assert_eq!(outcome.response, "Sure!");
        assert_eq!(outcome.stats.total_messages, 1);
        assert!(outcome.stats.is_active);
        assert!(outcome.warnings.is_empty());

        let outcome = manager.process_turn("again").await.unwrap();
        assert_eq!(outcome.stats.total_messages, 2);
    }

    #[tokio::test]
    async fn test_generation_failure_skips_write_back() {
        let episodic = Arc::new(MockMemoryStore::new(MemoryTier::Episodic));
        let manager = ConversationManager::new(
            &Config::default(),
            Arc::clone(&episodic) as Arc<dyn MemoryStore>,
            Arc::new(MockMemoryStore::new(MemoryTier::Semantic)),
            Arc::new(MockRuleStore::new()),
            Arc::new(MockGateway::failing()),
            Arc::new(NoopRulePolicy),
        );

        manager.start().unwrap();
        let err = manager.process_turn("hello").await.unwrap_err();
        assert!(matches!(err, RecallError::Generation(_)));

        // The user turn stays; the agent turn and episodic write never happen
        assert_eq!(manager.buffer_len(), 1);
        assert!(episodic.stored_records().is_empty());
        assert_eq!(manager.stats().unwrap().total_messages, 0);
    }

    #[tokio::test]
    async fn test_write_failure_returns_response_with_warning() {
        let manager = ConversationManager::new(
            &Config::default(),
            Arc::new(MockMemoryStore::new(MemoryTier::Episodic).failing_writes()),
            Arc::new(MockMemoryStore::new(MemoryTier::Semantic)),
            Arc::new(MockRuleStore::new()),
            Arc::new(MockGateway::new("Still here")),
            Arc::new(NoopRulePolicy),
        );

        manager.start().unwrap();
        let outcome = manager.process_turn("hello").await.unwrap();

        assert_eq!(outcome.response, "Still here");
        assert_eq!(outcome.stats.degraded_writes, 1);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_end_clears_buffer() {
        let manager = manager();
        manager.start().unwrap();
        manager.process_turn("hello").await.unwrap();
        assert!(manager.buffer_len() > 0);

        manager.end().await.unwrap();
        assert_eq!(manager.buffer_len(), 0);
        assert!(manager.ended_at().is_some());
    }

    #[tokio::test]
    async fn test_stats_before_start_fails() {
        let manager = manager();
        assert!(manager.stats().is_err());
    }
}
