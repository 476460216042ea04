//! Configuration loading, validation, and management for SprintLoop.
//!
//! Loads configuration from `~/.sprintloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.sprintloop/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Conversation endpoint settings
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Downstream Taiga API settings
    #[serde(default)]
    pub taiga: TaigaConfig,

    /// Per-run budgets
    #[serde(default)]
    pub budgets: BudgetConfig,

    /// HTTP shell settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Role → permission grants, merged over the built-in table.
    /// A listed role replaces the built-in grants for that role.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub roles: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_anthropic_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_model() -> String {
    "claude-3-5-sonnet-20241022".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_request_timeout() -> u64 {
    120
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_anthropic_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
            timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaigaConfig {
    #[serde(default = "default_taiga_url")]
    pub base_url: String,

    #[serde(default = "default_taiga_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_taiga_url() -> String {
    "https://api.taiga.io/api/v1".into()
}
fn default_taiga_timeout() -> u64 {
    10
}

impl Default for TaigaConfig {
    fn default() -> Self {
        Self {
            base_url: default_taiga_url(),
            timeout_secs: default_taiga_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy for downstream calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    2
}
fn default_base_delay_ms() -> u64 {
    250
}
fn default_max_delay_ms() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Budgets applied to every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,

    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    #[serde(default = "default_max_total_tool_calls")]
    pub max_total_tool_calls: u32,

    #[serde(default = "default_max_write_calls")]
    pub max_write_calls: u32,

    /// How many times one call fingerprint may occur before the run aborts
    #[serde(default = "default_max_repeated_calls")]
    pub max_repeated_calls: u32,
}

fn default_deadline() -> u64 {
    30
}
fn default_max_steps() -> u32 {
    10
}
fn default_max_total_tool_calls() -> u32 {
    25
}
fn default_max_write_calls() -> u32 {
    15
}
fn default_max_repeated_calls() -> u32 {
    2
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline(),
            max_steps: default_max_steps(),
            max_total_tool_calls: default_max_total_tool_calls(),
            max_write_calls: default_max_write_calls(),
            max_repeated_calls: default_max_repeated_calls(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.sprintloop/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `ANTHROPIC_API_KEY` (only when the file sets none)
    /// - `ANTHROPIC_MODEL`
    /// - `TAIGA_BASE_URL`
    /// - `SPRINTLOOP_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from a specific path, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if self.anthropic.api_key.is_none() {
            self.anthropic.api_key = lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty());
        }
        if let Some(model) = lookup("ANTHROPIC_MODEL") {
            self.anthropic.model = model;
        }
        if let Some(url) = lookup("TAIGA_BASE_URL") {
            self.taiga.base_url = url;
        }
        if let Some(port) = lookup("SPRINTLOOP_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("SPRINTLOOP_PORT is not a port: {port}"))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sprintloop")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.anthropic.temperature {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "anthropic.temperature must be between 0.0 and 1.0".into(),
                ));
            }
        }

        if self.anthropic.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "anthropic.max_tokens must be > 0".into(),
            ));
        }

        if self.taiga.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "taiga.retry.max_attempts must be at least 1".into(),
            ));
        }

        let b = &self.budgets;
        if b.deadline_secs == 0 || b.max_steps == 0 || b.max_total_tool_calls == 0 {
            return Err(ConfigError::ValidationError(
                "budgets.deadline_secs, max_steps and max_total_tool_calls must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.anthropic.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.budgets.max_steps, 10);
        assert_eq!(config.budgets.max_repeated_calls, 2);
        assert_eq!(config.taiga.retry.max_attempts, 2);
    }

    #[test]
    fn config_roundtrip_toml() {
        let toml_str = AppConfig::default_toml();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.budgets, BudgetConfig::default());
        assert_eq!(parsed.taiga.base_url, "https://api.taiga.io/api/v1");
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.anthropic.temperature = Some(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_budgets_rejected() {
        let mut config = AppConfig::default();
        config.budgets.max_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.anthropic.model, "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[budgets]
max_write_calls = 3

[roles]
qa = ["view_project", "view_us"]
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.budgets.max_write_calls, 3);
        assert_eq!(config.budgets.deadline_secs, 30);
        assert_eq!(config.roles["qa"], vec!["view_project", "view_us"]);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "budgets = 12").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("ANTHROPIC_MODEL", "claude-sonnet-4-20250514"),
            ("TAIGA_BASE_URL", "http://taiga.local/api/v1"),
            ("SPRINTLOOP_PORT", "9100"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert!(config.has_api_key());
        assert_eq!(config.anthropic.model, "claude-sonnet-4-20250514");
        assert_eq!(config.taiga.base_url, "http://taiga.local/api/v1");
        assert_eq!(config.gateway.port, 9100);
    }

    #[test]
    fn bad_port_override_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|k| (k == "SPRINTLOOP_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.anthropic.api_key = Some("sk-ant-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-ant-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
