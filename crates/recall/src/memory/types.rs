//! Core memory types for the Recall system
//!
//! Defines the data that crosses component boundaries: conversation turns,
//! retrieved memory records, procedural rules, and the per-turn context
//! bundle handed to the completion gateway.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a conversation participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Agent response
    Agent,
}

impl Role {
    /// Convert role to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
        }
    }
}

/// A single turn in the active conversation
///
/// Turns are immutable once appended to the working buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the speaker
    pub role: Role,
    /// Content of the message
    pub text: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn with the current timestamp
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an agent turn
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }
}

/// A record retrieved from (or stored into) a long-term memory tier
///
/// The `score` field carries descending relevance as assigned by the store
/// at retrieval time; it is meaningless on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier for this record
    pub id: Uuid,
    /// Full content of the record
    pub content: String,
    /// Short summary used when composing prompts
    pub summary: String,
    /// Relevance score assigned at retrieval time
    #[serde(default)]
    pub score: f32,
    /// Free-form metadata (source, tags, etc.)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// When this record was created
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Create a new record with a fresh id and zero score
    pub fn new(content: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            summary: summary.into(),
            score: 0.0,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A procedural behavior rule
///
/// Mutated only by the write-back pipeline's rule-upsert step; read in full
/// by the retrieval coordinator each turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier for this rule
    pub id: Uuid,
    /// The rule text, written in imperative form
    pub text: String,
    /// Whether the rule is currently in force
    pub active: bool,
}

impl Rule {
    /// Create a new active rule
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            active: true,
        }
    }
}

/// The three long-term memory tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryTier {
    /// Past conversation summaries, queried by similarity
    Episodic,
    /// Factual knowledge chunks, queried by similarity
    Semantic,
    /// Active behavioral rules, retrieved in full
    Procedural,
}

impl MemoryTier {
    /// Convert tier to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryTier::Episodic => "episodic",
            MemoryTier::Semantic => "semantic",
            MemoryTier::Procedural => "procedural",
        }
    }
}

impl FromStr for MemoryTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "episodic" => Ok(MemoryTier::Episodic),
            "semantic" => Ok(MemoryTier::Semantic),
            "procedural" => Ok(MemoryTier::Procedural),
            other => Err(format!("unknown memory tier: {other}")),
        }
    }
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The merged read-only context assembled for one turn
///
/// Built fresh per turn by the retrieval coordinator, never persisted, and
/// consumed once by the completion gateway.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    /// Snapshot of the working buffer at assembly time
    pub working_turns: Vec<Turn>,
    /// Episodic records, descending relevance
    pub episodic: Vec<MemoryRecord>,
    /// Semantic records, descending relevance
    pub semantic: Vec<MemoryRecord>,
    /// Active procedural rules
    pub procedural: Vec<Rule>,
    /// When the bundle was assembled
    pub assembled_at: DateTime<Utc>,
    /// Tiers that contributed an empty section due to timeout or failure
    pub degraded_tiers: Vec<MemoryTier>,
}

impl ContextBundle {
    /// Create an empty bundle carrying only the working snapshot
    pub fn with_working(working_turns: Vec<Turn>) -> Self {
        Self {
            working_turns,
            episodic: Vec::new(),
            semantic: Vec::new(),
            procedural: Vec::new(),
            assembled_at: Utc::now(),
            degraded_tiers: Vec::new(),
        }
    }

    /// Whether any tier was degraded during assembly
    pub fn is_degraded(&self) -> bool {
        !self.degraded_tiers.is_empty()
    }
}
