//! Project lookup by slug or id.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use sprintloop_core::error::ToolError;
use sprintloop_core::tool::Tool;
use sprintloop_taiga::TaigaApi;

use crate::{downstream, parse_args};

const NAME: &str = "taiga_get_project";

pub struct GetProjectTool;

#[derive(Deserialize)]
struct Args {
    project_ref: String,
}

#[async_trait]
impl<C: TaigaApi + ?Sized> Tool<C> for GetProjectTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get project details by slug or ID"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_ref": {"type": "string", "description": "Project slug or ID"}
            },
            "required": ["project_ref"]
        })
    }

    fn required_permissions(&self) -> &[&'static str] {
        &["view_project"]
    }

    async fn execute(&self, client: &C, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = parse_args(NAME, arguments)?;
        let project = client
            .get_project(&args.project_ref)
            .await
            .map_err(|e| downstream(NAME, e))?;
        Ok(json!({"id": project.id, "name": project.name, "slug": project.slug}))
    }
}
