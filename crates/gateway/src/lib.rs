//! HTTP API gateway for SprintLoop.
//!
//! Exposes the health check and the agent endpoint:
//!
//! - `GET /health`
//! - `POST /agent/run`: run the agent for one caller and return the
//!   created artifacts
//!
//! Built on Axum for high performance async HTTP.

pub mod api;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use sprintloop_agent::AgentOrchestrator;
use sprintloop_config::AppConfig;
use sprintloop_core::{Connector, Error};
use sprintloop_providers::AnthropicProvider;
use sprintloop_security::AuditLogger;
use sprintloop_taiga::TaigaConnector;

pub use api::{AgentRequest, AgentResponse, ApiError, UserContext};

const MAX_BODY_BYTES: usize = 1024 * 1024;

type SharedAgent<K> = Arc<AgentOrchestrator<K>>;

/// Build the Axum router.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - Permissive CORS
/// - HTTP trace logging
pub fn build_router<K>(agent: SharedAgent<K>) -> Router
where
    K: Connector + 'static,
    K::Client: 'static,
{
    Router::new()
        .route("/health", get(health_handler))
        .route("/agent/run", post(run_handler::<K>))
        .with_state(agent)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Build the production agent: Anthropic provider, Taiga connector, the
/// Taiga tool set and a tracing audit trail.
pub fn build_agent(config: &AppConfig) -> Result<SharedAgent<TaigaConnector>, Error> {
    let provider = AnthropicProvider::from_config(&config.anthropic)?;
    let connector =
        TaigaConnector::from_config(&config.taiga).map_err(|e| Error::Downstream(e.to_string()))?;
    let registry = Arc::new(sprintloop_tools::default_registry());

    Ok(Arc::new(
        AgentOrchestrator::from_config(Arc::new(provider), registry, Arc::new(connector), config)
            .with_audit(Arc::new(AuditLogger::tracing())),
    ))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let agent = build_agent(&config)?;
    let app = build_router(agent);

    info!(
        addr = %addr,
        model = %config.anthropic.model,
        taiga = %config.taiga.base_url,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn run_handler<K>(
    State(agent): State<SharedAgent<K>>,
    Json(payload): Json<AgentRequest>,
) -> Result<Json<AgentResponse>, ApiError>
where
    K: Connector + 'static,
    K::Client: 'static,
{
    info!(
        user = %payload.user_context.username,
        project_id = payload.project_id,
        milestone_id = payload.milestone_id,
        prompt_len = payload.prompt.len(),
        "Agent run requested"
    );

    match agent.run(payload.into()).await {
        Ok(response) => Ok(Json(response.into())),
        Err(e) => {
            error!(error = %e, "Agent run failed");
            Err(ApiError::internal(e))
        }
    }
}
