//! Provider trait: the abstraction over the conversation endpoint.
//!
//! A Provider takes the full message history, the visible tool schemas and
//! the system instructions, and returns the next assistant message together
//! with a stop reason telling the loop whether tool use is pending.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::ConversationMessage;

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "claude-3-5-sonnet-20241022")
    pub model: String,

    /// Fixed system instructions
    pub system: String,

    /// The conversation so far
    pub messages: Vec<ConversationMessage>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 = deterministic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub input_schema: serde_json::Value,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Final answer
    EndTurn,
    /// The model is waiting for tool results
    ToolUse,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    /// Whether the model considers its answer complete.
    pub fn is_final(self) -> bool {
        !matches!(self, StopReason::ToolUse)
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated assistant message
    pub message: ConversationMessage,

    pub stop_reason: StopReason,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Which model actually responded
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The core Provider trait.
///
/// The orchestrator calls `complete()` without knowing which endpoint sits
/// behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_reason_finality() {
        assert!(StopReason::EndTurn.is_final());
        assert!(StopReason::MaxTokens.is_final());
        assert!(!StopReason::ToolUse.is_final());
    }

    #[test]
    fn stop_reason_wire_names() {
        let parsed: StopReason = serde_json::from_str("\"tool_use\"").unwrap();
        assert_eq!(parsed, StopReason::ToolUse);
        assert_eq!(
            serde_json::to_string(&StopReason::EndTurn).unwrap(),
            "\"end_turn\""
        );
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "taiga_list_milestones".into(),
            description: "List all milestones (sprints) for a project".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "project_id": { "type": "integer", "description": "Project ID" }
                },
                "required": ["project_id"]
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("taiga_list_milestones"));
        assert!(json.contains("input_schema"));
    }
}
