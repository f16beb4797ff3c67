//! Completion gateway: the opaque text-generation collaborator
//!
//! The orchestrator hands the gateway an assembled context bundle plus the
//! user's message and gets back generated text. Everything behind the trait
//! (provider, prompt wire format, transport) is outside the memory core.

pub mod openai;
pub mod prompt;

use async_trait::async_trait;

use crate::error::Result;
use crate::memory::types::ContextBundle;

pub use openai::OpenAiGateway;

/// Trait for text-completion backends
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Generate a response to `user_message` given the assembled context
    ///
    /// Fails with [`crate::RecallError::Generation`] on transport, timeout,
    /// or provider errors.
    async fn generate(&self, bundle: &ContextBundle, user_message: &str) -> Result<String>;

    /// Gateway name for logging
    fn name(&self) -> &'static str;
}
