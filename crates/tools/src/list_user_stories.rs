use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use sprintloop_core::error::ToolError;
use sprintloop_core::tool::Tool;
use sprintloop_taiga::{TaigaApi, UserStory};

use crate::{downstream, parse_args};

const NAME: &str = "taiga_list_user_stories";

/// Lists a project's user stories, optionally only those of one sprint.
pub struct ListUserStoriesTool;

#[derive(Deserialize)]
struct Args {
    project_id: i64,
    #[serde(default)]
    milestone_id: Option<i64>,
}

/// JSON shape shared with the create tool's result.
pub(crate) fn story_json(story: UserStory) -> Value {
    json!({
        "id": story.id,
        "subject": story.subject,
        "description": story.description,
        "milestone": story.milestone,
        "tags": story.tags,
    })
}

#[async_trait]
impl<C: TaigaApi + ?Sized> Tool<C> for ListUserStoriesTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "List user stories, optionally filtered by milestone"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": {"type": "integer", "description": "Project ID"},
                "milestone_id": {"type": "integer", "description": "Optional milestone ID filter"}
            },
            "required": ["project_id"]
        })
    }

    fn required_permissions(&self) -> &[&'static str] {
        &["view_us"]
    }

    async fn execute(&self, client: &C, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = parse_args(NAME, arguments)?;
        let stories = client
            .list_user_stories(args.project_id, args.milestone_id)
            .await
            .map_err(|e| downstream(NAME, e))?;
        Ok(Value::Array(stories.into_iter().map(story_json).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTaiga;
    use sprintloop_taiga::NewUserStory;

    #[tokio::test]
    async fn filters_by_milestone() {
        let taiga = FakeTaiga::default();
        for (subject, milestone_id) in [("a", Some(10)), ("b", None), ("c", Some(10))] {
            taiga
                .create_user_story(&NewUserStory {
                    project_id: 7,
                    subject: subject.into(),
                    description: String::new(),
                    milestone_id,
                    tags: vec![],
                })
                .await
                .unwrap();
        }

        let all = Tool::<FakeTaiga>::execute(&ListUserStoriesTool, &taiga, json!({"project_id": 7}))
            .await
            .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 3);

        let sprint = Tool::<FakeTaiga>::execute(
            &ListUserStoriesTool,
            &taiga,
            json!({"project_id": 7, "milestone_id": 10}),
        )
        .await
        .unwrap();
        let subjects: Vec<&str> = sprint
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["subject"].as_str().unwrap())
            .collect();
        assert_eq!(subjects, vec!["a", "c"]);
        assert_eq!(sprint[0]["milestone"], 10);
    }
}
