//! Error types for Recall

use thiserror::Error;

/// Main error type for Recall operations
#[derive(Error, Debug)]
pub enum RecallError {
    /// Memory store errors (remote tier unavailable, bad reply, etc.)
    #[error("Store error: {0}")]
    Store(String),

    /// Completion gateway errors (transport, timeout, provider failure)
    #[error("Generation error: {0}")]
    Generation(String),

    /// Invalid conversation lifecycle transition
    #[error("Invalid conversation state: {0}")]
    State(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Recall operations
pub type Result<T> = std::result::Result<T, RecallError>;
