//! Post-turn write-back pipeline
//!
//! Runs strictly after the completion gateway: appends the agent response to
//! the working buffer, persists an episodic summary per the configured write
//! policy, and applies any rule decision. Write failures never fail the turn;
//! they are reported as warnings and counted as degraded writes, because the
//! response has already been generated and belongs to the user.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EpisodicWritePolicy;
use crate::memory::types::{MemoryRecord, Role, Rule, Turn};
use crate::memory::working::WorkingBuffer;
use crate::store::{MemoryStore, RuleStore};

/// Pluggable decision on whether an exchange implies a rule change
///
/// The real decision lives in agent/LLM logic outside this core; the
/// pipeline only applies whatever the policy yields.
pub trait RulePolicy: Send + Sync {
    /// Inspect the latest exchange; return a rule to add or revise, if any
    fn evaluate(&self, user_turn: &Turn, response: &str) -> Option<Rule>;
}

/// Policy that never proposes a rule change
pub struct NoopRulePolicy;

impl RulePolicy for NoopRulePolicy {
    fn evaluate(&self, _user_turn: &Turn, _response: &str) -> Option<Rule> {
        None
    }
}

/// Outcome of one write-back pass
#[derive(Debug, Default)]
pub struct WriteBackReport {
    /// Writes that failed and were downgraded to warnings
    pub degraded_writes: u64,
    /// Human-readable descriptions of what went wrong
    pub warnings: Vec<String>,
}

impl WriteBackReport {
    fn degrade(&mut self, warning: String) {
        warn!("{warning}");
        self.degraded_writes += 1;
        self.warnings.push(warning);
    }
}

/// Persists turn results into the long-term tiers and trims the buffer
pub struct WriteBackPipeline {
    buffer: Arc<WorkingBuffer>,
    episodic: Arc<dyn MemoryStore>,
    procedural: Arc<dyn RuleStore>,
    policy: Arc<dyn RulePolicy>,
    episodic_policy: EpisodicWritePolicy,
}

impl WriteBackPipeline {
    /// Create a pipeline over the buffer and write targets
    pub fn new(
        buffer: Arc<WorkingBuffer>,
        episodic: Arc<dyn MemoryStore>,
        procedural: Arc<dyn RuleStore>,
        policy: Arc<dyn RulePolicy>,
        episodic_policy: EpisodicWritePolicy,
    ) -> Self {
        Self {
            buffer,
            episodic,
            procedural,
            policy,
            episodic_policy,
        }
    }

    /// Run the per-turn steps after a successful generation
    pub async fn run_turn(
        &self,
        conversation_id: Uuid,
        user_message: &str,
        response: &str,
    ) -> WriteBackReport {
        let mut report = WriteBackReport::default();

        self.buffer.append(Turn::agent(response));

        if self.episodic_policy == EpisodicWritePolicy::PerTurn {
            let record = exchange_record(conversation_id, user_message, response);
            match self.episodic.store(&record).await {
                Ok(id) => debug!(%id, "stored episodic exchange summary"),
                Err(e) => report.degrade(format!("episodic store failed: {e}")),
            }
        }

        if let Some(rule) = self.policy.evaluate(&Turn::user(user_message), response) {
            match self.procedural.upsert_rule(&rule).await {
                Ok(id) => debug!(%id, "upserted procedural rule"),
                Err(e) => report.degrade(format!("procedural upsert failed: {e}")),
            }
        }

        report
    }

    /// Run the conversation-end steps: final episodic store, then buffer clear
    pub async fn finish_conversation(&self, conversation_id: Uuid) -> WriteBackReport {
        let mut report = WriteBackReport::default();

        if self.episodic_policy == EpisodicWritePolicy::EndOfConversation {
            let turns = self.buffer.snapshot();
            if !turns.is_empty() {
                let record = conversation_record(conversation_id, &turns);
                match self.episodic.store(&record).await {
                    Ok(id) => debug!(%id, "stored episodic conversation record"),
                    Err(e) => report.degrade(format!("episodic store failed: {e}")),
                }
            }
        }

        self.buffer.clear();
        report
    }
}

/// Episodic record covering a single user/agent exchange
fn exchange_record(conversation_id: Uuid, user_message: &str, response: &str) -> MemoryRecord {
    let content = format!("USER: {user_message}\nAGENT: {response}");
    MemoryRecord::new(content, truncate(user_message, 120))
        .with_metadata("conversation_id", conversation_id.to_string())
        .with_metadata("source", "conversation")
}

/// Episodic record covering the whole buffered conversation
fn conversation_record(conversation_id: Uuid, turns: &[Turn]) -> MemoryRecord {
    let content = turns
        .iter()
        .map(|t| {
            let role = match t.role {
                Role::User => "USER",
                Role::Agent => "AGENT",
            };
            format!("{role}: {}", t.text)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let summary = turns
        .iter()
        .find(|t| t.role == Role::User)
        .map(|t| truncate(&t.text, 120))
        .unwrap_or_else(|| "conversation".to_string());

    MemoryRecord::new(content, summary)
        .with_metadata("conversation_id", conversation_id.to_string())
        .with_metadata("source", "conversation")
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
