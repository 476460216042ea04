//! Task creation under an existing user story. A write tool.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use sprintloop_core::error::ToolError;
use sprintloop_core::tool::Tool;
use sprintloop_taiga::{NewTask, TaigaApi};
use tracing::info;

use crate::{downstream, parse_args};

const NAME: &str = "taiga_create_task";

pub struct CreateTaskTool;

#[derive(Deserialize)]
struct Args {
    user_story_id: i64,
    subject: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    project_id: Option<i64>,
}

#[async_trait]
impl<C: TaigaApi + ?Sized> Tool<C> for CreateTaskTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Create a new task for a user story"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_story_id": {"type": "integer", "description": "User story ID"},
                "subject": {"type": "string", "description": "Task title"},
                "description": {"type": "string", "description": "Task description"},
                "project_id": {"type": "integer", "description": "Project ID"},
                "idempotency_key": {"type": "string", "description": "Idempotency key"}
            },
            "required": ["user_story_id", "subject", "idempotency_key"]
        })
    }

    fn required_permissions(&self) -> &[&'static str] {
        &["add_task"]
    }

    fn is_write(&self) -> bool {
        true
    }

    async fn execute(&self, client: &C, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = parse_args(NAME, arguments)?;
        let task = client
            .create_task(&NewTask {
                user_story_id: args.user_story_id,
                subject: args.subject,
                description: args.description.unwrap_or_default(),
                project_id: args.project_id,
            })
            .await
            .map_err(|e| downstream(NAME, e))?;
        info!(task_id = task.id, user_story = task.user_story, "Created task");
        Ok(json!({
            "id": task.id,
            "subject": task.subject,
            "description": task.description,
            "user_story": task.user_story,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTaiga;

    #[tokio::test]
    async fn creates_task_under_story() {
        let taiga = FakeTaiga::default();
        let out = Tool::<FakeTaiga>::execute(
            &CreateTaskTool,
            &taiga,
            json!({
                "user_story_id": 101,
                "subject": "Wire form",
                "description": "Hook up validation",
                "idempotency_key": "t1"
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            out,
            json!({
                "id": 900,
                "subject": "Wire form",
                "description": "Hook up validation",
                "user_story": 101
            })
        );
        assert_eq!(taiga.tasks.lock().unwrap()[0].user_story, 101);
    }
}
