//! # SprintLoop Core
//!
//! Domain types, traits, and error definitions for the SprintLoop agent.
//! This crate has **no transport dependencies**: it defines the conversation
//! model, the provider and tool abstractions, and the per-run idempotency
//! cache that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! The conversation endpoint and the downstream client are traits here.
//! Implementations live in their respective crates, which keeps the agent
//! loop testable with scripted providers and in-memory clients.

pub mod connector;
pub mod error;
pub mod idempotency;
pub mod message;
pub mod permission;
pub mod provider;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use connector::Connector;
pub use error::{Error, Result};
pub use idempotency::IdempotencyCache;
pub use message::{ContentBlock, ConversationMessage, Role};
pub use permission::PermissionSet;
pub use provider::{Provider, ProviderRequest, ProviderResponse, StopReason, ToolDefinition};
pub use tool::{IDEMPOTENCY_KEY, Tool, ToolOutput, ToolRegistry};
