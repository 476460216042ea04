//! Tool trait and registry: the capabilities the model may invoke.
//!
//! Tools are generic over the downstream client `C` they act on, so the same
//! registry and dispatch rules serve the real HTTP client and in-memory fakes.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::ToolError;
use crate::idempotency::IdempotencyCache;
use crate::permission::PermissionSet;
use crate::provider::ToolDefinition;
use crate::schema;

/// Argument name carrying the idempotency token of a write call.
pub const IDEMPOTENCY_KEY: &str = "idempotency_key";

/// The core Tool trait.
///
/// Each tool declares its schema, the permission tokens a caller needs, and
/// whether it mutates external state.
#[async_trait]
pub trait Tool<C: ?Sized + Sync>: Send + Sync {
    /// The unique name of this tool (e.g., "taiga_create_task").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Permission tokens required to see and call this tool.
    fn required_permissions(&self) -> &[&'static str];

    /// Whether execution mutates external state.
    fn is_write(&self) -> bool {
        false
    }

    /// Execute the tool against the downstream client.
    ///
    /// Arguments have already been validated against `parameters_schema`.
    async fn execute(&self, client: &C, arguments: Value) -> Result<Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}

/// The result of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub data: Value,
    /// Served from the idempotency cache without running the handler.
    pub from_cache: bool,
}

impl ToolOutput {
    /// Text form fed back to the model.
    pub fn render(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

struct RegisteredTool<C: ?Sized + Sync> {
    tool: Box<dyn Tool<C>>,
    definition: ToolDefinition,
    required: Vec<&'static str>,
}

/// A registry of available tools.
///
/// Built once at startup and shared immutably. The orchestrator uses it to:
/// 1. Get the definitions a caller may see
/// 2. Dispatch the calls the model requests
pub struct ToolRegistry<C: ?Sized + Sync> {
    tools: Vec<RegisteredTool<C>>,
    index: HashMap<String, usize>,
}

impl<C: ?Sized + Sync> ToolRegistry<C> {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. A tool with the same name is replaced in place.
    pub fn register(&mut self, tool: Box<dyn Tool<C>>) {
        let name = tool.name().to_string();
        let entry = RegisteredTool {
            definition: tool.to_definition(),
            required: tool.required_permissions().to_vec(),
            tool,
        };
        match self.index.get(&name) {
            Some(&i) => self.tools[i] = entry,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(entry);
            }
        }
    }

    fn entry(&self, name: &str) -> Option<&RegisteredTool<C>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Definitions of the tools whose required permissions are covered,
    /// in registration order.
    pub fn list_visible(&self, permissions: &PermissionSet) -> Vec<ToolDefinition> {
        let visible: Vec<ToolDefinition> = self
            .tools
            .iter()
            .filter(|e| permissions.covers(&e.required))
            .map(|e| e.definition.clone())
            .collect();
        info!(
            visible = visible.len(),
            registered = self.tools.len(),
            "Exposed tools based on permissions"
        );
        visible
    }

    /// Whether the tool's schema declares an idempotency token.
    pub fn requires_idempotency_key(&self, name: &str) -> bool {
        self.entry(name)
            .is_some_and(|e| schema::declares_property(&e.definition.input_schema, IDEMPOTENCY_KEY))
    }

    /// Whether the tool mutates external state. Unknown tools are not writes.
    pub fn is_write(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|e| e.tool.is_write())
    }

    /// Dispatch a call after access, schema and idempotency checks.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: &Value,
        permissions: &PermissionSet,
        client: &C,
        cache: &mut IdempotencyCache,
    ) -> Result<ToolOutput, ToolError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        if !permissions.covers(&entry.required) {
            return Err(ToolError::PermissionDenied {
                tool_name: name.to_string(),
                missing: permissions.missing(&entry.required).join(", "),
            });
        }

        schema::validate(&entry.definition.input_schema, arguments).map_err(|reason| {
            ToolError::InvalidArguments {
                tool_name: name.to_string(),
                reason,
            }
        })?;

        let token = arguments
            .get(IDEMPOTENCY_KEY)
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty());

        if let Some(cached) = token.and_then(|t| cache.get(t)) {
            info!(tool = %name, "Returning cached result for idempotency key");
            return Ok(ToolOutput {
                data: cached.clone(),
                from_cache: true,
            });
        }

        let data = entry.tool.execute(client, arguments.clone()).await?;

        if let (true, Some(token)) = (entry.tool.is_write(), token) {
            debug!(tool = %name, "Caching write result");
            cache.insert(token, data.clone());
        }

        Ok(ToolOutput {
            data,
            from_cache: false,
        })
    }

    /// List all registered tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|e| e.definition.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl<C: ?Sized + Sync> Default for ToolRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
