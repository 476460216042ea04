//! `sprintloop run`: one agent run, result printed as JSON.

use std::path::Path;

use sprintloop_agent::RunRequest;

use super::load_config;

pub async fn run(
    config: Option<&Path>,
    prompt: String,
    roles: Vec<String>,
    token: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let agent = sprintloop_gateway::build_agent(&config)?;

    let response = agent.run(RunRequest::new(prompt, roles, token)).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.outcome.is_aborted() {
        tracing::warn!(outcome = ?response.outcome, "Run ended early");
    }
    Ok(())
}
