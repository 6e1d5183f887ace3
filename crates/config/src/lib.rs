//! Configuration loading, validation, and management for Zabbot.
//!
//! Two layers:
//! - [`AppConfig`]: startup configuration from `~/.zabbot/config.toml` with
//!   environment variable overrides. Validated once at startup.
//! - [`SettingsStore`]: the agent's provider settings and credentials, kept in
//!   their own file and re-read on every chat request so edits take effect
//!   without a restart.

pub mod settings;

pub use settings::{AgentSettings, SettingsStore, SettingsUpdate};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.zabbot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Monitoring API connection
    #[serde(default)]
    pub zabbix: ZabbixConfig,

    /// Conversation loop tuning
    #[serde(default)]
    pub agent: AgentTuning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ZabbixConfig {
    #[serde(default = "default_zabbix_url")]
    pub url: String,

    #[serde(default = "default_zabbix_user")]
    pub user: String,

    #[serde(default = "default_zabbix_password")]
    pub password: String,

    #[serde(default)]
    pub verify_ssl: bool,

    #[serde(default = "default_zabbix_timeout")]
    pub timeout_secs: u64,
}

fn default_zabbix_url() -> String {
    "http://127.0.0.1/zabbix".into()
}
fn default_zabbix_user() -> String {
    "Admin".into()
}
fn default_zabbix_password() -> String {
    "zabbix".into()
}
fn default_zabbix_timeout() -> u64 {
    30
}

impl Default for ZabbixConfig {
    fn default() -> Self {
        Self {
            url: default_zabbix_url(),
            user: default_zabbix_user(),
            password: default_zabbix_password(),
            verify_ssl: false,
            timeout_secs: default_zabbix_timeout(),
        }
    }
}

impl std::fmt::Debug for ZabbixConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZabbixConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("verify_ssl", &self.verify_ssl)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTuning {
    /// Timeout for a single provider round-trip
    #[serde(default = "default_round_trip_timeout")]
    pub round_trip_timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Where provider settings live (default: `~/.zabbot/agent.toml`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_file: Option<PathBuf>,
}

fn default_round_trip_timeout() -> u64 {
    120
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_temperature() -> f32 {
    0.5
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            round_trip_timeout_secs: default_round_trip_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            settings_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.zabbot/config.toml).
    ///
    /// Environment variables override file values:
    /// `ZABBIX_URL`, `ZABBIX_USER`, `ZABBIX_PASSWORD`, `ZABBIX_VERIFY_SSL`,
    /// `ZABBOT_PORT`.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
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

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ZABBIX_URL") {
            self.zabbix.url = url;
        }
        if let Some(user) = lookup("ZABBIX_USER") {
            self.zabbix.user = user;
        }
        if let Some(password) = lookup("ZABBIX_PASSWORD") {
            self.zabbix.password = password;
        }
        if let Some(verify) = lookup("ZABBIX_VERIFY_SSL") {
            self.zabbix.verify_ssl = verify.eq_ignore_ascii_case("true");
        }
        if let Some(port) = lookup("ZABBOT_PORT").and_then(|p| p.parse().ok()) {
            self.gateway.port = port;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".zabbot")
    }

    /// Path of the agent settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.agent
            .settings_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("agent.toml"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.temperature < 0.0 || self.agent.temperature > 1.0 {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 1.0".into(),
            ));
        }

        if self.agent.round_trip_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.round_trip_timeout_secs must be > 0".into(),
            ));
        }

        if self.agent.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tokens must be > 0".into(),
            ));
        }

        if !self.zabbix.url.starts_with("http://") && !self.zabbix.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "zabbix.url must be an http(s) URL, got '{}'",
                self.zabbix.url
            )));
        }

        Ok(())
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

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
