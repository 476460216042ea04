//! Request and response bodies of the agent endpoint.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use sprintloop_agent::{Artifacts, RunRequest, RunResponse};

/// The caller as identified by the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

/// Body of `POST /agent/run`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub project_id: i64,
    pub milestone_id: i64,
    pub prompt: String,
    pub auth_token: String,
    #[serde(default)]
    pub refresh: String,
    pub user_context: UserContext,
    #[serde(default)]
    pub user_story_id: Option<i64>,
}

impl std::fmt::Debug for AgentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRequest")
            .field("project_id", &self.project_id)
            .field("milestone_id", &self.milestone_id)
            .field("user_story_id", &self.user_story_id)
            .field("user_context", &self.user_context)
            .field("auth_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl AgentRequest {
    /// The prompt with the target project and sprint prepended.
    pub fn contextual_prompt(&self) -> String {
        let mut context = format!(
            "Context: project_id={}, milestone_id={}",
            self.project_id, self.milestone_id
        );
        if let Some(story) = self.user_story_id {
            context.push_str(&format!(", user_story_id={story}"));
        }
        format!("{context}\n\n{}", self.prompt)
    }
}

impl From<AgentRequest> for RunRequest {
    fn from(request: AgentRequest) -> Self {
        RunRequest::new(
            request.contextual_prompt(),
            request.user_context.roles,
            request.auth_token,
        )
        .with_actor(request.user_context.username)
    }
}

/// Body returned by `POST /agent/run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub summary: String,
    pub artifacts: Artifacts,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl From<RunResponse> for AgentResponse {
    fn from(response: RunResponse) -> Self {
        Self {
            summary: response.summary,
            artifacts: response.artifacts,
            warnings: response.warnings,
        }
    }
}

/// Error body: `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({"detail": self.detail})),
        )
            .into_response()
    }
}
