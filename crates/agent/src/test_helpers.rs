//! Shared test helpers: a scripted provider and an in-memory Taiga.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sprintloop_core::error::ProviderError;
use sprintloop_core::provider::Usage;
use sprintloop_core::{
    Connector, ContentBlock, ConversationMessage, Error, Provider, ProviderRequest,
    ProviderResponse, Role, StopReason,
};
use sprintloop_taiga::{
    Milestone, NewTask, NewUserStory, Project, TaigaApi, TaigaError, Task, UserStory,
};

use crate::orchestrator::AgentOrchestrator;

/// One scripted model turn.
pub enum Step {
    Respond(ProviderResponse),
    /// Sleep before responding; with a paused clock this advances time.
    Stall(Duration, ProviderResponse),
    Fail(ProviderError),
}

/// A provider that replays a script and records every request.
///
/// Once the script runs out it answers with a plain final text.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Stall(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Step::Fail(e)) => Err(e),
            None => Ok(final_text("Script exhausted.")),
        }
    }
}

pub fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.into(),
        name: name.into(),
        input,
    }
}

/// An assistant turn requesting the given tool calls.
pub fn tool_turn(calls: Vec<ContentBlock>) -> ProviderResponse {
    ProviderResponse {
        message: ConversationMessage {
            role: Role::Assistant,
            content: calls,
        },
        stop_reason: StopReason::ToolUse,
        usage: Some(Usage {
            input_tokens: 10,
            output_tokens: 5,
        }),
        model: "mock-model".into(),
    }
}

/// A final assistant answer.
pub fn final_text(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: ConversationMessage::assistant(text),
        stop_reason: StopReason::EndTurn,
        usage: None,
        model: "mock-model".into(),
    }
}

#[derive(Default)]
struct FakeState {
    stories: Mutex<Vec<UserStory>>,
    tasks: Mutex<Vec<Task>>,
    list_calls: AtomicUsize,
}

/// In-memory Taiga: project 7 ("demo") with sprints 5 and 6. Clones share
/// state.
#[derive(Clone, Default)]
pub struct FakeTaiga {
    state: Arc<FakeState>,
}

impl FakeTaiga {
    pub fn stories_created(&self) -> usize {
        self.state.stories.lock().unwrap().len()
    }

    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaigaApi for FakeTaiga {
    async fn get_project(&self, project_ref: &str) -> Result<Project, TaigaError> {
        match project_ref {
            "7" | "demo" => Ok(Project {
                id: 7,
                name: "Demo".into(),
                slug: "demo".into(),
            }),
            _ => Err(TaigaError::Status {
                status: 404,
                body: "not found".into(),
            }),
        }
    }

    async fn list_milestones(&self, project_id: i64) -> Result<Vec<Milestone>, TaigaError> {
        Ok([(5, "Sprint 5"), (6, "Sprint 6")]
            .into_iter()
            .map(|(id, name)| Milestone {
                id,
                name: name.into(),
                project: project_id,
            })
            .collect())
    }

    async fn list_user_stories(
        &self,
        project_id: i64,
        milestone_id: Option<i64>,
    ) -> Result<Vec<UserStory>, TaigaError> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state
            .stories
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.project == project_id)
            .filter(|s| milestone_id.is_none() || s.milestone == milestone_id)
            .cloned()
            .collect())
    }

    async fn create_user_story(&self, story: &NewUserStory) -> Result<UserStory, TaigaError> {
        let mut stories = self.state.stories.lock().unwrap();
        let created = UserStory {
            id: 100 + stories.len() as i64,
            subject: story.subject.clone(),
            description: Some(story.description.clone()),
            project: story.project_id,
            milestone: story.milestone_id,
            tags: story.tags.clone(),
        };
        stories.push(created.clone());
        Ok(created)
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, TaigaError> {
        let mut tasks = self.state.tasks.lock().unwrap();
        let created = Task {
            id: 900 + tasks.len() as i64,
            subject: task.subject.clone(),
            description: Some(task.description.clone()),
            user_story: task.user_story_id,
        };
        tasks.push(created.clone());
        Ok(created)
    }
}

/// Hands out clones of one [`FakeTaiga`]; an empty token fails.
pub struct FakeConnector {
    taiga: FakeTaiga,
}

impl Connector for FakeConnector {
    type Client = FakeTaiga;

    fn connect(&self, auth_token: &str) -> sprintloop_core::Result<FakeTaiga> {
        if auth_token.is_empty() {
            return Err(Error::Downstream("auth_token required".into()));
        }
        Ok(self.taiga.clone())
    }
}

/// Orchestrator over the real Taiga tool set and the given fakes.
pub fn orchestrator(
    provider: Arc<ScriptedProvider>,
    taiga: &FakeTaiga,
) -> AgentOrchestrator<FakeConnector> {
    AgentOrchestrator::new(
        provider,
        Arc::new(sprintloop_tools::default_registry()),
        Arc::new(FakeConnector {
            taiga: taiga.clone(),
        }),
        "mock-model",
    )
}
