//! Conversation state and statistics
//!
//! Tracks per-conversation lifecycle data mutated after every turn, the
//! write-once summary produced at conversation end, and the read-only
//! snapshot exposed for external reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mutable state of one conversation
///
/// Created on `start()`, updated after every turn, finalized exactly once on
/// `end()` and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    /// Conversation identifier
    pub id: Uuid,
    /// When the conversation started
    pub started_at: DateTime<Utc>,
    /// When the conversation ended, if it has
    pub ended_at: Option<DateTime<Utc>>,
    /// Completed turns so far
    pub turn_count: u64,
    /// Whether the conversation is still active
    pub is_active: bool,
    /// Running sum of per-turn response latencies
    pub total_response_latency_ms: u64,
    /// Write-back failures recorded as warnings rather than turn errors
    pub degraded_writes: u64,
}

impl ConversationState {
    /// Create state for a freshly started conversation
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            turn_count: 0,
            is_active: true,
            total_response_latency_ms: 0,
            degraded_writes: 0,
        }
    }

    /// Record a completed turn
    pub fn record_turn(&mut self, latency_ms: u64, degraded_writes: u64) {
        self.turn_count += 1;
        self.total_response_latency_ms += latency_ms;
        self.degraded_writes += degraded_writes;
    }

    /// Mark the conversation ended
    pub fn finalize(&mut self) {
        self.ended_at = Some(Utc::now());
        self.is_active = false;
    }

    /// Average response latency over completed turns
    pub fn avg_response_time_ms(&self) -> f64 {
        if self.turn_count == 0 {
            return 0.0;
        }
        self.total_response_latency_ms as f64 / self.turn_count as f64
    }

    /// Elapsed seconds since start (up to end time once finalized)
    pub fn duration_seconds(&self) -> f64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Write-once summary produced when a conversation ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation identifier
    pub id: Uuid,
    /// Total conversation duration in seconds
    pub duration_seconds: f64,
    /// Number of completed turns
    pub total_messages: u64,
    /// Average response latency in milliseconds
    pub avg_response_time_ms: f64,
}

impl ConversationSummary {
    /// Derive the summary from finalized state
    pub fn from_state(state: &ConversationState) -> Self {
        Self {
            id: state.id,
            duration_seconds: state.duration_seconds(),
            total_messages: state.turn_count,
            avg_response_time_ms: state.avg_response_time_ms(),
        }
    }
}

/// Read-only statistics snapshot exposed for external reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Conversation identifier
    pub session_id: Uuid,
    /// Number of completed turns
    pub total_messages: u64,
    /// Whether the conversation is still active
    pub is_active: bool,
    /// Elapsed seconds since start
    pub duration_seconds: f64,
    /// Average response latency in milliseconds
    pub avg_response_time_ms: f64,
    /// Write-back failures recorded so far
    pub degraded_writes: u64,
}

impl From<&ConversationState> for StatsSnapshot {
    fn from(state: &ConversationState) -> Self {
        Self {
            session_id: state.id,
            total_messages: state.turn_count,
            is_active: state.is_active,
            duration_seconds: state.duration_seconds(),
            avg_response_time_ms: state.avg_response_time_ms(),
            degraded_writes: state.degraded_writes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = ConversationState::new();
        assert!(state.is_active);
        assert!(state.ended_at.is_none());
        assert_eq!(state.turn_count, 0);
        assert_eq!(state.total_response_latency_ms, 0);
        assert_eq!(state.degraded_writes, 0);
    }

    #[test]
    fn test_record_turn_accumulates() {
        let mut state = ConversationState::new();
        state.record_turn(120, 0);
        state.record_turn(80, 1);

        assert_eq!(state.turn_count, 2);
        assert_eq!(state.total_response_latency_ms, 200);
        assert_eq!(state.degraded_writes, 1);
        assert!((state.avg_response_time_ms() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_avg_response_time_with_no_turns() {
        let state = ConversationState::new();
        assert_eq!(state.avg_response_time_ms(), 0.0);
    }

    #[test]
    fn test_finalize_sets_end_and_deactivates() {
        let mut state = ConversationState::new();
        state.finalize();

        assert!(!state.is_active);
        assert!(state.ended_at.is_some());
        assert!(state.duration_seconds() >= 0.0);
    }

    #[test]
    fn test_summary_from_state() {
        let mut state = ConversationState::new();
        state.record_turn(100, 0);
        state.record_turn(300, 0);
        state.finalize();

        let summary = ConversationSummary::from_state(&state);
        assert_eq!(summary.id, state.id);
        assert_eq!(summary.total_messages, 2);
        assert!((summary.avg_response_time_ms - 200.0).abs() < f64::EPSILON);
        assert!(summary.duration_seconds >= 0.0);
    }

    #[test]
    fn test_stats_snapshot_fields() {
        let mut state = ConversationState::new();
        state.record_turn(50, 1);

        let snapshot = StatsSnapshot::from(&state);
        assert_eq!(snapshot.session_id, state.id);
        assert_eq!(snapshot.total_messages, 1);
        assert!(snapshot.is_active);
        assert_eq!(snapshot.degraded_writes, 1);
    }

    #[test]
    fn test_snapshot_serialization() {
        let state = ConversationState::new();
        let snapshot = StatsSnapshot::from(&state);
        let json = serde_json::to_string(&snapshot).expect("serialize snapshot");
        assert!(json.contains("session_id"));
        assert!(json.contains("avg_response_time_ms"));
    }
}
