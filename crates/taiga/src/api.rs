use async_trait::async_trait;

use crate::error::TaigaError;
use crate::models::{Milestone, NewTask, NewUserStory, Project, Task, UserStory};

/// The Taiga operations the agent's tools need.
#[async_trait]
pub trait TaigaApi: Send + Sync {
    /// Fetch a project by numeric id or slug.
    async fn get_project(&self, project_ref: &str) -> Result<Project, TaigaError>;

    async fn list_milestones(&self, project_id: i64) -> Result<Vec<Milestone>, TaigaError>;

    /// Find a milestone by name, ignoring case and surrounding whitespace.
    async fn get_milestone_by_name(
        &self,
        project_id: i64,
        name: &str,
    ) -> Result<Option<Milestone>, TaigaError> {
        let wanted = name.trim().to_lowercase();
        Ok(self
            .list_milestones(project_id)
            .await?
            .into_iter()
            .find(|m| m.name.trim().to_lowercase() == wanted))
    }

    async fn list_user_stories(
        &self,
        project_id: i64,
        milestone_id: Option<i64>,
    ) -> Result<Vec<UserStory>, TaigaError>;

    async fn create_user_story(&self, story: &NewUserStory) -> Result<UserStory, TaigaError>;

    async fn create_task(&self, task: &NewTask) -> Result<Task, TaigaError>;
}
