//! Sprint lookup by name ("Sprint 6"). Answers `null` when no sprint matches.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use sprintloop_core::error::ToolError;
use sprintloop_core::tool::Tool;
use sprintloop_taiga::TaigaApi;

use crate::{downstream, parse_args};

const NAME: &str = "taiga_get_milestone_by_name";

pub struct GetMilestoneByNameTool;

#[derive(Deserialize)]
struct Args {
    project_id: i64,
    sprint_ref: String,
}

#[async_trait]
impl<C: TaigaApi + ?Sized> Tool<C> for GetMilestoneByNameTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Find a milestone by name (e.g., 'Sprint 6')"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "integer", "description": "Project ID"},
                "sprint_ref": {"type": "string", "description": "Sprint name"}
            },
            "required": ["project_id", "sprint_ref"]
        })
    }

    fn required_permissions(&self) -> &[&'static str] {
        &["view_milestones"]
    }

    async fn execute(&self, client: &C, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = parse_args(NAME, arguments)?;
        let milestone = client
            .get_milestone_by_name(args.project_id, &args.sprint_ref)
            .await
            .map_err(|e| downstream(NAME, e))?;
        Ok(milestone
            .map(|m| json!({"id": m.id, "name": m.name, "project": m.project}))
            .unwrap_or(Value::Null))
    }
}
