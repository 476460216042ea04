//! User story creation. A write tool: the registry caches its result under
//! the call's `idempotency_key`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use sprintloop_core::error::ToolError;
use sprintloop_core::tool::Tool;
use sprintloop_taiga::{NewUserStory, TaigaApi};
use tracing::info;

use crate::list_user_stories::story_json;
use crate::{downstream, parse_args};

const NAME: &str = "taiga_create_user_story";

pub struct CreateUserStoryTool;

#[derive(Deserialize)]
struct Args {
    project_id: i64,
    subject: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    milestone_id: Option<i64>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[async_trait]
impl<C: TaigaApi + ?Sized> Tool<C> for CreateUserStoryTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Create a new user story"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "integer", "description": "Project ID"},
                "subject": {"type": "string", "description": "User story title"},
                "description": {"type": "string", "description": "User story description"},
                "milestone_id": {"type": "integer", "description": "Optional milestone ID"},
                "tags": {"type": "array", "items": {"type": "string"}, "description": "Optional tags"},
                "idempotency_key": {"type": "string", "description": "Idempotency key"}
            },
            "required": ["project_id", "subject", "idempotency_key"]
        })
    }

    fn required_permissions(&self) -> &[&'static str] {
        &["add_us"]
    }

    fn is_write(&self) -> bool {
        true
    }

    async fn execute(&self, client: &C, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = parse_args(NAME, arguments)?;
        let story = client
            .create_user_story(&NewUserStory {
                project_id: args.project_id,
                subject: args.subject,
                description: args.description.unwrap_or_default(),
                milestone_id: args.milestone_id,
                tags: args.tags.unwrap_or_default(),
            })
            .await
            .map_err(|e| downstream(NAME, e))?;
        info!(story_id = story.id, milestone = ?story.milestone, "Created user story");
        Ok(story_json(story))
    }
}
