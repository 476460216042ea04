use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use sprintloop_core::error::ToolError;
use sprintloop_core::tool::Tool;
use sprintloop_taiga::TaigaApi;

use crate::{downstream, parse_args};

const NAME: &str = "taiga_list_milestones";

/// Lists every sprint of a project.
pub struct ListMilestonesTool;

#[derive(Deserialize)]
struct Args {
    project_id: i64,
}

#[async_trait]
impl<C: TaigaApi + ?Sized> Tool<C> for ListMilestonesTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "List all milestones (sprints) for a project"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "integer", "description": "Project ID"}
            },
            "required": ["project_id"]
        })
    }

    fn required_permissions(&self) -> &[&'static str] {
        &["view_milestones"]
    }

    async fn execute(&self, client: &C, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = parse_args(NAME, arguments)?;
        let milestones = client
            .list_milestones(args.project_id)
            .await
            .map_err(|e| downstream(NAME, e))?;
        Ok(Value::Array(
            milestones
                .into_iter()
                .map(|m| json!({"id": m.id, "name": m.name, "project": m.project}))
                .collect(),
        ))
    }
}
