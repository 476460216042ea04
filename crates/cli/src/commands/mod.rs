pub mod config_cmd;
pub mod run;
pub mod serve;
pub mod tools;

use std::path::Path;

use sprintloop_config::AppConfig;

/// Load the config from an explicit path or the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
    match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))
}
