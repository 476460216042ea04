//! `reqwest` implementation of [`TaigaApi`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sprintloop_config::TaigaConfig;
use sprintloop_core::{Connector, Error};
use tracing::{debug, warn};

use crate::api::TaigaApi;
use crate::error::TaigaError;
use crate::models::{Milestone, NewTask, NewUserStory, Project, Task, UserStory};
use crate::retry::{RetryPolicy, with_retry};

/// Shared entry point to the Taiga API.
///
/// Owns the connection pool; [`TaigaConnector::client`] binds it to a
/// caller's token without opening new connections.
#[derive(Debug, Clone)]
pub struct TaigaConnector {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl TaigaConnector {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, TaigaError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TaigaError::from_reqwest)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn from_config(config: &TaigaConfig) -> Result<Self, TaigaError> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            RetryPolicy::from(&config.retry),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A client acting with the given bearer token.
    pub fn client(&self, auth_token: impl Into<String>) -> TaigaClient {
        TaigaClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: auth_token.into(),
            retry: self.retry.clone(),
        }
    }
}

impl Connector for TaigaConnector {
    type Client = TaigaClient;

    fn connect(&self, auth_token: &str) -> sprintloop_core::Result<TaigaClient> {
        if auth_token.trim().is_empty() {
            return Err(Error::Downstream("auth_token required".into()));
        }
        Ok(self.client(auth_token))
    }
}

/// Taiga client bound to one caller's token.
pub struct TaigaClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for TaigaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaigaClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TaigaClient {
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TaigaError> {
        let url = format!("{}{path}", self.base_url);
        with_retry(&self.retry, path, || {
            let request = self.http.get(&url).bearer_auth(&self.token).query(query);
            async move { Self::decode("GET", path, request.send().await).await }
        })
        .await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TaigaError> {
        let url = format!("{}{path}", self.base_url);
        with_retry(&self.retry, path, || {
            let request = self.http.post(&url).bearer_auth(&self.token).json(body);
            async move { Self::decode("POST", path, request.send().await).await }
        })
        .await
    }

    async fn decode<T: DeserializeOwned>(
        method: &str,
        path: &str,
        sent: reqwest::Result<reqwest::Response>,
    ) -> Result<T, TaigaError> {
        let response = sent.map_err(TaigaError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(method, path, status = status.as_u16(), "Taiga request failed");
            return Err(TaigaError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(method, path, status = status.as_u16(), "Taiga request succeeded");
        response
            .json()
            .await
            .map_err(|e| TaigaError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TaigaApi for TaigaClient {
    async fn get_project(&self, project_ref: &str) -> Result<Project, TaigaError> {
        let project_ref = project_ref.trim();
        match project_ref.parse::<i64>() {
            Ok(id) => self.get(&format!("/projects/{id}"), &[]).await,
            Err(_) => {
                self.get("/projects/by_slug", &[("slug", project_ref.to_string())])
                    .await
            }
        }
    }

    async fn list_milestones(&self, project_id: i64) -> Result<Vec<Milestone>, TaigaError> {
        self.get("/milestones", &[("project", project_id.to_string())])
            .await
    }

    async fn list_user_stories(
        &self,
        project_id: i64,
        milestone_id: Option<i64>,
    ) -> Result<Vec<UserStory>, TaigaError> {
        let mut query = vec![("project", project_id.to_string())];
        if let Some(milestone) = milestone_id {
            query.push(("milestone", milestone.to_string()));
        }
        self.get("/userstories", &query).await
    }

    async fn create_user_story(&self, story: &NewUserStory) -> Result<UserStory, TaigaError> {
        self.post("/userstories", story).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, TaigaError> {
        self.post("/tasks", task).await
    }
}
