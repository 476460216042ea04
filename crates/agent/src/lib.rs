//! The budgeted agent loop: the heart of SprintLoop.
//!
//! A run follows a **Turn → Model → Tools** cycle:
//!
//! 1. **Derive** the caller's permissions and the tools they may see
//! 2. **Send** the history and tool schemas to the model
//! 3. **If tool calls**: deduplicate, budget-check and dispatch each one,
//!    append the results, loop back to step 2
//! 4. **If a final answer**: reduce the cached write results into artifacts
//!
//! Every run is bounded by a wall-clock deadline and by step, tool-call,
//! write-call and repeat ceilings.

pub mod artifacts;
pub mod budget;
pub mod dedupe;
pub mod orchestrator;

#[cfg(test)]
mod test_helpers;

pub use artifacts::{Artifacts, StoryArtifact, TaskArtifact};
pub use budget::{Budgets, RunState};
pub use dedupe::{CallDeduplicator, fingerprint};
pub use orchestrator::{AgentOrchestrator, Credentials, RunOutcome, RunRequest, RunResponse, SYSTEM_PROMPT};
