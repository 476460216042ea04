//! Taiga tool implementations for SprintLoop.
//!
//! Read tools look up projects, sprints and stories; write tools create
//! user stories and tasks. Every tool is generic over the [`TaigaApi`]
//! client it acts on.

pub mod create_task;
pub mod create_user_story;
pub mod get_milestone_by_name;
pub mod get_project;
pub mod list_milestones;
pub mod list_user_stories;

use serde::de::DeserializeOwned;
use serde_json::Value;
use sprintloop_core::error::ToolError;
use sprintloop_core::tool::ToolRegistry;
use sprintloop_taiga::{TaigaApi, TaigaError};

pub use create_task::CreateTaskTool;
pub use create_user_story::CreateUserStoryTool;
pub use get_milestone_by_name::GetMilestoneByNameTool;
pub use get_project::GetProjectTool;
pub use list_milestones::ListMilestonesTool;
pub use list_user_stories::ListUserStoriesTool;

/// Create a registry with all Taiga tools, reads first.
pub fn default_registry<C: TaigaApi + ?Sized>() -> ToolRegistry<C> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(GetProjectTool));
    registry.register(Box::new(ListMilestonesTool));
    registry.register(Box::new(GetMilestoneByNameTool));
    registry.register(Box::new(ListUserStoriesTool));
    registry.register(Box::new(CreateUserStoryTool));
    registry.register(Box::new(CreateTaskTool));
    registry
}

fn parse_args<T: DeserializeOwned>(tool_name: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool_name: tool_name.into(),
        reason: e.to_string(),
    })
}

fn downstream(tool_name: &str, err: TaigaError) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool_name.into(),
        reason: err.to_string(),
    }
}
