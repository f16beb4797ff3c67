//! Recall - Multi-tier memory for conversational agents
//!
//! This crate provides a memory orchestrator that manages a bounded working
//! buffer, fans out concurrent retrieval to episodic, semantic, and
//! procedural stores, and drives the post-turn write-back pipeline.

pub mod config;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod orchestrator;
pub mod store;
pub mod testing;

pub use error::RecallError;
