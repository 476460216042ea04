//! `sprintloop tools`: list the tools visible to the given roles.

use std::path::Path;

use sprintloop_core::ToolDefinition;
use sprintloop_security::CapabilityGate;
use sprintloop_taiga::TaigaClient;

use super::load_config;

pub fn run(config: Option<&Path>, roles: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let tools = visible_tools(&CapabilityGate::from_config(&config), roles);

    if tools.is_empty() {
        println!("No tools available for roles: {}", roles.join(", "));
        return Ok(());
    }
    for tool in tools {
        println!("  {:<30} {}", tool.name, tool.description);
    }
    Ok(())
}

fn visible_tools(gate: &CapabilityGate, roles: &[String]) -> Vec<ToolDefinition> {
    let permissions = gate.permissions_for(roles);
    sprintloop_tools::default_registry::<TaigaClient>().list_visible(&permissions)
}
