//! The agent orchestrator: one budgeted run from prompt to artifacts.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sprintloop_config::AppConfig;
use sprintloop_core::{
    Connector, ContentBlock, ConversationMessage, IDEMPOTENCY_KEY, PermissionSet, Provider,
    ProviderRequest, Result, Role, ToolDefinition, ToolRegistry,
};
use sprintloop_security::{AuditEvent, AuditLogger, AuditOutcome, CapabilityGate};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artifacts::Artifacts;
use crate::budget::{Budgets, RunState};

/// Fixed instructions sent with every model call.
pub const SYSTEM_PROMPT: &str = "You are an AI assistant that helps manage Taiga project management tasks.

You have access to tools for reading and creating user stories and tasks in Taiga.

When the user provides meeting minutes and asks you to create user stories and tasks:
1. First, get the project details
2. Find the target milestone (sprint) by name
3. Create user stories with clear subjects and descriptions
4. Create tasks for each user story

Be efficient and avoid redundant tool calls. Always use the idempotency_key parameter for write operations.
Provide a clear summary of what you created.";

const NO_TOOLS_SUMMARY: &str = "No tools available for your role";
const FALLBACK_SUMMARY: &str = "Task completed";

/// Downstream credentials of the caller.
#[derive(Clone)]
pub struct Credentials {
    pub auth_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

/// Input of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub prompt: String,
    pub roles: Vec<String>,
    pub credentials: Credentials,
    /// Overrides the orchestrator's default budgets.
    pub budgets: Option<Budgets>,
    /// Who is running the agent, for the audit trail.
    pub actor: String,
}

impl RunRequest {
    pub fn new(prompt: impl Into<String>, roles: Vec<String>, auth_token: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            roles,
            credentials: Credentials {
                auth_token: auth_token.into(),
            },
            budgets: None,
            actor: "anonymous".into(),
        }
    }

    pub fn with_budgets(mut self, budgets: Budgets) -> Self {
        self.budgets = Some(budgets);
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model gave a final answer.
    Completed,
    /// The caller's roles grant no tools; the model was never called.
    NoTools,
    /// Deadline, tool-call or step budget reached at the start of a turn.
    BudgetExhausted,
    /// The model endpoint failed.
    ModelFailed,
    /// A call fingerprint repeated past the ceiling.
    LoopDetected,
    /// A write call went over the write ceiling.
    WriteBudgetExceeded,
}

impl RunOutcome {
    /// Whether the run was cut off mid-turn.
    pub fn is_aborted(self) -> bool {
        matches!(self, RunOutcome::LoopDetected | RunOutcome::WriteBudgetExceeded)
    }
}

/// Result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResponse {
    pub summary: String,
    pub artifacts: Artifacts,
    pub warnings: Vec<String>,
    pub outcome: RunOutcome,
}

struct ToolCall {
    id: String,
    name: String,
    input: Value,
}

struct RunContext<'a, C> {
    run_id: &'a str,
    actor: &'a str,
    permissions: &'a PermissionSet,
    client: &'a C,
}

/// Drives the turn-by-turn exchange between the model and the tools.
///
/// Shared across runs; every call to [`AgentOrchestrator::run`] owns its
/// own [`RunState`].
pub struct AgentOrchestrator<K: Connector> {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry<K::Client>>,
    connector: Arc<K>,
    gate: CapabilityGate,
    audit: Option<Arc<AuditLogger>>,
    model: String,
    system_prompt: String,
    max_tokens: u32,
    temperature: Option<f32>,
    budgets: Budgets,
}

impl<K: Connector> AgentOrchestrator<K> {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry<K::Client>>,
        connector: Arc<K>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            connector,
            gate: CapabilityGate::default(),
            audit: None,
            model: model.into(),
            system_prompt: SYSTEM_PROMPT.into(),
            max_tokens: 4096,
            temperature: None,
            budgets: Budgets::default(),
        }
    }

    /// Model settings, budgets and role table from the app config.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry<K::Client>>,
        connector: Arc<K>,
        config: &AppConfig,
    ) -> Self {
        Self::new(provider, registry, connector, &config.anthropic.model)
            .with_max_tokens(config.anthropic.max_tokens)
            .with_temperature(config.anthropic.temperature)
            .with_budgets(Budgets::from(&config.budgets))
            .with_gate(CapabilityGate::from_config(config))
    }

    pub fn with_gate(mut self, gate: CapabilityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_budgets(mut self, budgets: Budgets) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn registry(&self) -> &ToolRegistry<K::Client> {
        &self.registry
    }

    pub fn gate(&self) -> &CapabilityGate {
        &self.gate
    }

    pub fn budgets(&self) -> &Budgets {
        &self.budgets
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Tools the given roles may see, in registration order.
    pub fn visible_tools<S: AsRef<str>>(&self, roles: &[S]) -> Vec<ToolDefinition> {
        self.registry.list_visible(&self.gate.permissions_for(roles))
    }

    /// Execute one run.
    ///
    /// Budget exhaustion, loops, tool failures and model failures all end
    /// in `Ok` with warnings. `Err` means the run could not start, e.g. the
    /// downstream client could not be built.
    pub async fn run(&self, request: RunRequest) -> Result<RunResponse> {
        let run_id = Uuid::new_v4().to_string();
        let budgets = request.budgets.unwrap_or(self.budgets);
        let permissions = self.gate.permissions_for(&request.roles);
        let tools = self.registry.list_visible(&permissions);

        info!(
            run_id = %run_id,
            actor = %request.actor,
            roles = ?request.roles,
            tools = tools.len(),
            "Starting agent run"
        );

        if tools.is_empty() {
            warn!(run_id = %run_id, "No tools visible for caller roles");
            return Ok(RunResponse {
                summary: NO_TOOLS_SUMMARY.into(),
                artifacts: Artifacts::default(),
                warnings: vec!["User has no permissions".into()],
                outcome: RunOutcome::NoTools,
            });
        }

        let client = self.connector.connect(&request.credentials.auth_token)?;
        let ctx = RunContext {
            run_id: &run_id,
            actor: &request.actor,
            permissions: &permissions,
            client: &client,
        };
        let mut state = RunState::new(request.prompt, &budgets);

        let outcome = loop {
            if let Some(exhausted) = state.check_turn(&budgets) {
                warn!(
                    run_id = %run_id,
                    step = state.step,
                    total_calls = state.total_calls,
                    reason = exhausted.warning(),
                    "Run budget exhausted"
                );
                state.warn(exhausted.warning());
                break RunOutcome::BudgetExhausted;
            }

            state.step += 1;
            info!(run_id = %run_id, step = state.step, max_steps = budgets.max_steps, "Agent step");

            let request = ProviderRequest {
                model: self.model.clone(),
                system: self.system_prompt.clone(),
                messages: state.history.clone(),
                tools: tools.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };

            let response = match self.provider.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    error!(run_id = %run_id, provider = self.provider.name(), error = %e, "Model call failed");
                    state.warn(format!("LLM error: {e}"));
                    break RunOutcome::ModelFailed;
                }
            };

            if let Some(usage) = &response.usage {
                info!(
                    run_id = %run_id,
                    model = %response.model,
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "Model usage"
                );
            }
            debug!(
                stop_reason = ?response.stop_reason,
                blocks = response.message.content.len(),
                "Model response"
            );

            let mut message = response.message;
            self.inject_idempotency_keys(&mut message);
            let calls = tool_calls(&message);
            state.history.push(message);

            // A final answer, or any turn without tool-use blocks, ends the run.
            if calls.is_empty() {
                break RunOutcome::Completed;
            }

            let mut results = Vec::with_capacity(calls.len());
            let mut aborted = None;
            for call in calls {
                match self.handle_call(&ctx, &mut state, &budgets, call).await {
                    ControlFlow::Continue(block) => results.push(block),
                    ControlFlow::Break(outcome) => {
                        aborted = Some(outcome);
                        break;
                    }
                }
            }
            if !results.is_empty() {
                state.history.push(ConversationMessage::tool_results(results));
            }
            if let Some(outcome) = aborted {
                break outcome;
            }
        };

        let artifacts = Artifacts::from_cache(&state.cache);
        let summary = summarize(&state.history);

        info!(
            run_id = %run_id,
            outcome = ?outcome,
            steps = state.step,
            tool_calls = state.total_calls,
            write_calls = state.write_calls,
            stories = artifacts.user_stories.len(),
            warnings = state.warnings.len(),
            "Agent run finished"
        );

        Ok(RunResponse {
            summary,
            artifacts,
            warnings: state.warnings,
            outcome,
        })
    }

    /// Give every write call lacking a usable token a fresh one. A null,
    /// non-string or blank token counts as missing. The token is also
    /// written into the history so the model sees what was used.
    fn inject_idempotency_keys(&self, message: &mut ConversationMessage) {
        for block in &mut message.content {
            let ContentBlock::ToolUse { name, input, .. } = block else {
                continue;
            };
            if !self.registry.requires_idempotency_key(name) {
                continue;
            }
            if let Value::Object(args) = input {
                let missing = args
                    .get(IDEMPOTENCY_KEY)
                    .and_then(Value::as_str)
                    .is_none_or(|t| t.trim().is_empty());
                if missing {
                    let token = Uuid::new_v4().to_string();
                    debug!(tool = %name, token = %token, "Injected idempotency key");
                    args.insert(IDEMPOTENCY_KEY.into(), Value::String(token));
                }
            }
        }
    }

    /// Loop check, write budget, then dispatch. `Break` aborts the run
    /// before the call is dispatched.
    async fn handle_call(
        &self,
        ctx: &RunContext<'_, K::Client>,
        state: &mut RunState,
        budgets: &Budgets,
        call: ToolCall,
    ) -> ControlFlow<RunOutcome, ContentBlock> {
        let sighting = state.dedupe.observe(&call.name, &call.input);
        if sighting.looping {
            let reason = format!("Loop detected: {}", call.name);
            warn!(
                run_id = %ctx.run_id,
                tool = %call.name,
                fingerprint = %sighting.fingerprint,
                count = sighting.count,
                "Repeated tool call, aborting run"
            );
            self.record(ctx, AuditEvent::RunAborted { reason: reason.clone() }, ctx.run_id, AuditOutcome::Failure, None);
            state.warn(reason);
            return ControlFlow::Break(RunOutcome::LoopDetected);
        }

        if self.registry.is_write(&call.name) && !state.record_write(budgets) {
            let reason = "Max write calls exceeded";
            warn!(
                run_id = %ctx.run_id,
                tool = %call.name,
                write_calls = state.write_calls,
                "Write budget exceeded, aborting run"
            );
            self.record(ctx, AuditEvent::RunAborted { reason: reason.into() }, ctx.run_id, AuditOutcome::Failure, None);
            state.warn(reason);
            return ControlFlow::Break(RunOutcome::WriteBudgetExceeded);
        }

        state.total_calls += 1;
        info!(run_id = %ctx.run_id, tool = %call.name, fingerprint = %sighting.fingerprint, "Calling tool");

        let dispatched = self
            .registry
            .dispatch(&call.name, &call.input, ctx.permissions, ctx.client, &mut state.cache)
            .await;

        match dispatched {
            Ok(output) => {
                let outcome = if output.from_cache {
                    AuditOutcome::Cached
                } else {
                    AuditOutcome::Success
                };
                self.record(ctx, AuditEvent::ToolExecution { tool_name: call.name.clone() }, &call.name, outcome, None);
                ControlFlow::Continue(ContentBlock::tool_result(call.id, output.render()))
            }
            Err(e) => {
                warn!(run_id = %ctx.run_id, tool = %call.name, error = %e, "Tool call failed");
                let event = if e.is_access_denied() {
                    (AuditEvent::PermissionDenied { tool_name: call.name.clone() }, AuditOutcome::Denied)
                } else {
                    (AuditEvent::ToolExecution { tool_name: call.name.clone() }, AuditOutcome::Failure)
                };
                self.record(ctx, event.0, &call.name, event.1, Some(e.to_string()));
                ControlFlow::Continue(ContentBlock::tool_error(call.id, &e))
            }
        }
    }

    fn record(
        &self,
        ctx: &RunContext<'_, K::Client>,
        event: AuditEvent,
        target: &str,
        outcome: AuditOutcome,
        details: Option<String>,
    ) {
        if let Some(audit) = &self.audit {
            audit.log(event, ctx.actor, target, outcome, details);
        }
    }
}

fn tool_calls(message: &ConversationMessage) -> Vec<ToolCall> {
    message
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Text of the latest assistant message that has any.
fn summarize(history: &[ConversationMessage]) -> String {
    history
        .iter()
        .rev()
        .filter(|m| m.role == Role::Assistant)
        .find_map(|m| m.text())
        .unwrap_or(FALLBACK_SUMMARY)
        .to_string()
}
