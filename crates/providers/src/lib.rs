//! Conversation endpoint implementations for SprintLoop.
//!
//! All providers implement the `sprintloop_core::Provider` trait.

pub mod anthropic;

pub use anthropic::AnthropicProvider;
