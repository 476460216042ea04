//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sprintloop_config::AnthropicConfig;
use sprintloop_core::error::ProviderError;
use sprintloop_core::message::{ContentBlock, ConversationMessage, Role};
use sprintloop_core::provider::*;
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with a default HTTP client.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_timeout(api_key, Duration::from_secs(120))
    }

    fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build from the `[anthropic]` config section. Requires an API key.
    pub fn from_config(config: &AnthropicConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ProviderError::NotConfigured("ANTHROPIC_API_KEY environment variable required".into())
        })?;
        Ok(Self::with_timeout(api_key, Duration::from_secs(config.timeout_secs))?
            .with_base_url(&config.api_url))
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert messages to Anthropic API format.
    fn to_api_messages(messages: &[ConversationMessage]) -> Vec<AnthropicMessage<'_>> {
        messages
            .iter()
            .map(|msg| AnthropicMessage {
                role: match msg.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: &msg.content,
            })
            .collect()
    }

    /// Convert tool definitions to Anthropic format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool<'_>> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: &t.name,
                description: &t.description,
                input_schema: &t.input_schema,
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "system": request.system,
            "messages": Self::to_api_messages(&request.messages),
            "max_tokens": request.max_tokens,
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        if let Some(t) = request.temperature {
            body["temperature"] = serde_json::json!(t);
        }

        body
    }

    /// Convert Anthropic API response to our ProviderResponse.
    fn response_to_provider_response(resp: AnthropicResponse) -> ProviderResponse {
        let content: Vec<ContentBlock> = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(ContentBlock::Text { text }),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                ResponseContentBlock::Other => None,
            })
            .collect();

        let message = ConversationMessage {
            role: Role::Assistant,
            content,
        };

        let stop_reason = match resp.stop_reason.as_deref() {
            Some("end_turn") => StopReason::EndTurn,
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ if message.has_tool_use() => StopReason::ToolUse,
            _ => StopReason::EndTurn,
        };

        ProviderResponse {
            message,
            stop_reason,
            usage: Some(Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
            }),
            model: resp.model,
        }
    }
}

#[async_trait]
impl sprintloop_core::Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            provider = "anthropic",
            model = %request.model,
            tools = request.tools.len(),
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        Ok(Self::response_to_provider_response(api_resp))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a [ContentBlock],
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprintloop_core::Provider;

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test").unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = AnthropicProvider::new("sk-ant-test")
            .unwrap()
            .with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn from_config_requires_key() {
        let config = AnthropicConfig::default();
        assert!(matches!(
            AnthropicProvider::from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));

        let config = AnthropicConfig {
            api_key: Some("sk-ant-test".into()),
            api_url: "http://localhost:9999/".into(),
            ..AnthropicConfig::default()
        };
        let provider = AnthropicProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url, "http://localhost:9999");
    }

    #[test]
    fn message_conversion_keeps_blocks() {
        let messages = vec![
            ConversationMessage::user("Create the sprint stories"),
            ConversationMessage {
                role: Role::Assistant,
                content: vec![
                    ContentBlock::text("Looking up the project"),
                    ContentBlock::ToolUse {
                        id: "toolu_123".into(),
                        name: "taiga_get_project".into(),
                        input: serde_json::json!({"project_ref": "demo"}),
                    },
                ],
            },
            ConversationMessage::tool_results(vec![ContentBlock::tool_error("toolu_123", "404")]),
        ];

        let api = serde_json::to_value(AnthropicProvider::to_api_messages(&messages)).unwrap();
        assert_eq!(api[0]["role"], "user");
        assert_eq!(api[0]["content"][0]["type"], "text");
        assert_eq!(api[1]["role"], "assistant");
        assert_eq!(api[1]["content"][1]["type"], "tool_use");
        assert_eq!(api[1]["content"][1]["input"]["project_ref"], "demo");
        assert_eq!(api[2]["role"], "user");
        assert_eq!(api[2]["content"][0]["type"], "tool_result");
        assert_eq!(api[2]["content"][0]["tool_use_id"], "toolu_123");
        assert_eq!(api[2]["content"][0]["is_error"], true);
    }

    #[test]
    fn body_includes_system_tools_and_optional_temperature() {
        let request = ProviderRequest {
            model: "claude-3-5-sonnet-20241022".into(),
            system: "You manage Taiga".into(),
            messages: vec![ConversationMessage::user("hi")],
            tools: vec![ToolDefinition {
                name: "taiga_list_milestones".into(),
                description: "List milestones".into(),
                input_schema: serde_json::json!({"type": "object"}),
            }],
            max_tokens: 4096,
            temperature: None,
        };
        let body = AnthropicProvider::build_body(&request);
        assert_eq!(body["system"], "You manage Taiga");
        assert_eq!(body["tools"][0]["name"], "taiga_list_milestones");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert!(body.get("temperature").is_none());

        let body = AnthropicProvider::build_body(&ProviderRequest {
            temperature: Some(0.2),
            tools: vec![],
            ..request
        });
        assert!(body.get("tools").is_none());
        assert!(body["temperature"].is_number());
    }

    #[test]
    fn parse_text_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_01",
                "model": "claude-3-5-sonnet-20241022",
                "content": [{"type": "text", "text": "Created 2 stories."}],
                "usage": {"input_tokens": 10, "output_tokens": 5},
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();

        let pr = AnthropicProvider::response_to_provider_response(resp);
        assert_eq!(pr.message.text(), Some("Created 2 stories."));
        assert!(!pr.message.has_tool_use());
        assert_eq!(pr.stop_reason, StopReason::EndTurn);
        assert_eq!(pr.usage.unwrap().output_tokens, 5);
    }

    #[test]
    fn parse_tool_use_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_02",
                "model": "claude-3-5-sonnet-20241022",
                "content": [
                    {"type": "text", "text": "Let me find the sprint"},
                    {"type": "tool_use", "id": "toolu_abc", "name": "taiga_get_milestone_by_name",
                     "input": {"project_id": 7, "sprint_ref": "Sprint 6"}}
                ],
                "usage": {"input_tokens": 20, "output_tokens": 10},
                "stop_reason": "tool_use"
            }"#,
        )
        .unwrap();

        let pr = AnthropicProvider::response_to_provider_response(resp);
        assert_eq!(pr.stop_reason, StopReason::ToolUse);
        match &pr.message.content[1] {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "toolu_abc");
                assert_eq!(name, "taiga_get_milestone_by_name");
                assert_eq!(input["sprint_ref"], "Sprint 6");
            }
            other => panic!("Expected tool_use block, got {other:?}"),
        }
    }

    #[test]
    fn unknown_blocks_are_skipped() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_03",
                "model": "claude-3-5-sonnet-20241022",
                "content": [
                    {"type": "thinking", "thinking": "I need to consider..."},
                    {"type": "text", "text": "Done."}
                ],
                "usage": {"input_tokens": 15, "output_tokens": 25}
            }"#,
        )
        .unwrap();

        let pr = AnthropicProvider::response_to_provider_response(resp);
        assert_eq!(pr.message.content.len(), 1);
        assert_eq!(pr.stop_reason, StopReason::EndTurn);
    }
}
