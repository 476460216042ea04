//! `sprintloop serve`: start the HTTP API server.

use std::path::Path;

use super::load_config;

pub async fn run(config: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        return Err("No API key configured: set ANTHROPIC_API_KEY or [anthropic].api_key".into());
    }

    println!("SprintLoop Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Taiga:     {}", config.taiga.base_url);

    sprintloop_gateway::start(config).await?;

    Ok(())
}
