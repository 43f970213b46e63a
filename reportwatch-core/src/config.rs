//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/reportwatch/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/reportwatch/` (~/.config/reportwatch/)
//! - State/Logs: `$XDG_STATE_HOME/reportwatch/` (~/.local/state/reportwatch/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Report backend location
    #[serde(default)]
    pub server: ServerConfig,

    /// Poll cadence for the two log streams
    #[serde(default)]
    pub polling: PollingConfig,

    /// Session folding behaviour
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Report backend configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Base URL of the report backend (e.g., `http://localhost:5001`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Agent log path template; `{report_id}` is substituted
    #[serde(default = "default_agent_log_path")]
    pub agent_log_path: String,

    /// Console log path template; `{report_id}` is substituted
    #[serde(default = "default_console_log_path")]
    pub console_log_path: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            agent_log_path: default_agent_log_path(),
            console_log_path: default_console_log_path(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ServerConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(Error::Config("server.base_url must not be empty".to_string()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::Config(format!(
                "server.base_url must start with http:// or https://, got {:?}",
                base
            )));
        }
        for (key, path) in [
            ("server.agent_log_path", &self.agent_log_path),
            ("server.console_log_path", &self.console_log_path),
        ] {
            if !path.contains("{report_id}") {
                return Err(Error::Config(format!(
                    "{} must contain the {{report_id}} placeholder",
                    key
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "server.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "http://localhost:5001".to_string()
}

fn default_agent_log_path() -> String {
    "/api/report/{report_id}/agent-log".to_string()
}

fn default_console_log_path() -> String {
    "/api/report/{report_id}/console-log".to_string()
}

fn default_timeout() -> u64 {
    10
}

/// Poll interval configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    /// Agent log poll interval in milliseconds
    #[serde(default = "default_agent_interval")]
    pub agent_interval_ms: u64,

    /// Console log poll interval in milliseconds
    #[serde(default = "default_console_interval")]
    pub console_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            agent_interval_ms: default_agent_interval(),
            console_interval_ms: default_console_interval(),
        }
    }
}

impl PollingConfig {
    pub fn agent_interval(&self) -> Duration {
        Duration::from_millis(self.agent_interval_ms.max(1))
    }

    pub fn console_interval(&self) -> Duration {
        Duration::from_millis(self.console_interval_ms.max(1))
    }
}

fn default_agent_interval() -> u64 {
    2000
}

fn default_console_interval() -> u64 {
    1500
}

/// What to do when a second outline arrives in the same session
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutlinePolicy {
    /// Keep the first outline seen
    #[default]
    FirstWriteWins,
    /// Replace the outline every time a new one arrives
    LastWriteWins,
}

/// Session folding configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub outline_policy: OutlinePolicy,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.server.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/reportwatch/config.toml` (~/.config/reportwatch/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("reportwatch").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/reportwatch/` (~/.local/state/reportwatch/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("reportwatch")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/reportwatch/reportwatch.log` (~/.local/state/reportwatch/reportwatch.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("reportwatch.log")
    }
}
