//! SprintLoop CLI: the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP gateway
//! - `run`     Run the agent once and print the JSON result
//! - `tools`   List the tools visible to a set of roles
//! - `config`  Print the default configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "sprintloop",
    about = "SprintLoop: turns meeting notes into Taiga user stories and tasks",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to ~/.sprintloop/config.toml)
    #[arg(short, long, global = true, env = "SPRINTLOOP_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the agent once against Taiga
    Run {
        /// Meeting notes or instructions
        #[arg(short, long)]
        prompt: String,

        /// Caller role; repeat for several
        #[arg(short, long = "role", required = true)]
        roles: Vec<String>,

        /// Taiga bearer token
        #[arg(short, long, env = "TAIGA_AUTH_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// List the tools a set of roles can see
    Tools {
        /// Caller role; repeat for several
        #[arg(short, long = "role")]
        roles: Vec<String>,
    },

    /// Print the default configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Run {
            prompt,
            roles,
            token,
        } => commands::run::run(config, prompt, roles, token).await?,
        Commands::Tools { roles } => commands::tools::run(config, &roles)?,
        Commands::Config => commands::config_cmd::run(),
    }

    Ok(())
}
