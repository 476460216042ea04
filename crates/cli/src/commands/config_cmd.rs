//! `sprintloop config`: print the default configuration.

use sprintloop_config::AppConfig;

pub fn run() {
    println!("# {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", AppConfig::default_toml());
}
