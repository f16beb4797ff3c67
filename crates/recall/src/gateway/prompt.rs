//! Rendering a context bundle into chat messages
//!
//! The system message carries the long-term memory sections (procedural
//! rules, episodic summaries, semantic chunks); the working turns follow as
//! alternating chat messages, then the new user message. The coordinator
//! hands the bundle over unmodified, so rendering is the only place bundle
//! content is flattened into text.

use serde::Serialize;

use crate::memory::types::{ContextBundle, Role};

/// One chat message on the completions wire
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    /// "system", "user", or "assistant"
    pub role: String,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Render a bundle and the new user message into a chat message sequence
///
/// The working snapshot is taken after the new user message was appended, so
/// a trailing user turn matching `user_message` is skipped rather than sent
/// twice.
pub fn render_messages(bundle: &ContextBundle, user_message: &str) -> Vec<ChatMessage> {
    let mut turns = bundle.working_turns.as_slice();
    if let Some(last) = turns.last() {
        if last.role == Role::User && last.text == user_message {
            turns = &turns[..turns.len() - 1];
        }
    }

    let mut messages = Vec::with_capacity(turns.len() + 2);
    messages.push(ChatMessage::new("system", render_system_prompt(bundle)));

    for turn in turns {
        let role = match turn.role {
            Role::User => "user",
            Role::Agent => "assistant",
        };
        messages.push(ChatMessage::new(role, turn.text.clone()));
    }

    messages.push(ChatMessage::new("user", user_message));
    messages
}

/// Compose the system prompt from the long-term memory sections
fn render_system_prompt(bundle: &ContextBundle) -> String {
    let mut prompt = String::from(
        "You are a helpful assistant with access to long-term memory. \
         Use the memory sections below when they are relevant.",
    );

    if !bundle.procedural.is_empty() {
        prompt.push_str("\n\nBehavior rules:\n");
        for (i, rule) in bundle.procedural.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, rule.text));
        }
    }

    if !bundle.episodic.is_empty() {
        prompt.push_str("\nPast conversations:\n");
        for record in &bundle.episodic {
            prompt.push_str(&format!("- {}\n", record.summary));
        }
    }

    if !bundle.semantic.is_empty() {
        prompt.push_str("\nRelevant knowledge:\n");
        for (i, record) in bundle.semantic.iter().enumerate() {
            prompt.push_str(&format!("[{}] {}\n", i + 1, record.content));
        }
    }

    prompt
}
