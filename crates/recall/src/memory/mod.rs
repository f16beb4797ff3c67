//! Memory model: core data types, conversation state, and the working buffer

pub mod state;
pub mod types;
pub mod working;

pub use state::{ConversationState, ConversationSummary, StatsSnapshot};
pub use types::{ContextBundle, MemoryRecord, MemoryTier, Role, Rule, Turn};
pub use working::WorkingBuffer;
