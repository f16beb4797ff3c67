//! Bounded working buffer for the active conversation
//!
//! Holds the most recent turns of the active conversation with FIFO eviction
//! once capacity is exceeded. Appends never fail; readers take an owned
//! snapshot so an in-flight retrieval is never corrupted by a concurrent
//! append.

use std::collections::VecDeque;
use std::sync::RwLock;

use crate::memory::types::{Role, Turn};

/// Bounded, ordered, in-process store of the active conversation's turns
///
/// A single writer appends at a time; `snapshot()` may be called concurrently
/// with appends. The internal lock is never held across an await point.
pub struct WorkingBuffer {
    turns: RwLock<VecDeque<Turn>>,
    capacity: usize,
}

impl WorkingBuffer {
    /// Create a buffer retaining at most `capacity` turns
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a turn, evicting from the front until the capacity holds
    pub fn append(&self, turn: Turn) {
        let mut turns = self.turns.write().expect("working buffer lock poisoned");
        turns.push_back(turn);
        while turns.len() > self.capacity {
            turns.pop_front();
        }
    }

    /// Owned copy of the current turns, oldest first
    pub fn snapshot(&self) -> Vec<Turn> {
        let turns = self.turns.read().expect("working buffer lock poisoned");
        turns.iter().cloned().collect()
    }

    /// Remove all turns
    pub fn clear(&self) {
        let mut turns = self.turns.write().expect("working buffer lock poisoned");
        turns.clear();
    }

    /// Number of retained turns
    pub fn len(&self) -> usize {
        self.turns.read().expect("working buffer lock poisoned").len()
    }

    /// Whether the buffer holds no turns
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fraction of capacity currently in use, for stats reporting
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.len() as f64 / self.capacity as f64
    }

    /// Most recent user turn, if any
    pub fn last_user_turn(&self) -> Option<Turn> {
        self.last_turn_with_role(Role::User)
    }

    /// Most recent agent turn, if any
    pub fn last_agent_turn(&self) -> Option<Turn> {
        self.last_turn_with_role(Role::Agent)
    }

    fn last_turn_with_role(&self, role: Role) -> Option<Turn> {
        let turns = self.turns.read().expect("working buffer lock poisoned");
        turns.iter().rev().find(|t| t.role == role).cloned()
    }
}
