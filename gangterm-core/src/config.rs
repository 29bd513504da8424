//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/gangterm/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/gangterm/` (~/.config/gangterm/)
//! - State/Logs: `$XDG_STATE_HOME/gangterm/` (~/.local/state/gangterm/)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

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
    /// Head Honcho endpoint settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Guardian settings forwarded with chat queries
    #[serde(default)]
    pub guardian: GuardianConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote backend configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    /// WebSocket URL of the backend (e.g., `wss://your-backend.ngrok-free.app`)
    pub url: Option<String>,

    /// Seconds to wait for the WebSocket handshake
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Connect once at startup. Never retries after a disconnect.
    #[serde(default)]
    pub auto_connect: bool,

    /// Workspace sync target the backend was bootstrapped with.
    ///
    /// Snapshots only succeed when the backend has one; this value is only
    /// used to remind the operator when it is missing.
    pub workspace_sync_target: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_secs: default_connect_timeout(),
            auto_connect: false,
            workspace_sync_target: None,
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}

impl RemoteConfig {
    /// Handshake timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.url {
            validate_ws_url(url)?;
        }
        if self.connect_timeout_secs == 0 {
            return Err(Error::Config(
                "remote.connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.auto_connect && self.url.is_none() {
            return Err(Error::Config(
                "remote.url is required when remote.auto_connect is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Check that `url` parses and uses the `ws` or `wss` scheme.
pub fn validate_ws_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(Error::InvalidUrl(format!(
            "URL must use ws:// or wss:// scheme, got: {}",
            other
        ))),
    }
}

/// Guardian configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct GuardianConfig {
    /// Security level reported to the backend as `guardian_mode`
    #[serde(default)]
    pub security_level: SecurityLevel,
}

/// Guardian security levels
///
/// Written in lowercase in the config file, sent capitalized on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all(deserialize = "lowercase"))]
pub enum SecurityLevel {
    #[default]
    Standard,
    Lockdown,
    Development,
}

impl SecurityLevel {
    /// Display label, identical to the wire value
    pub fn label(&self) -> &'static str {
        match self {
            SecurityLevel::Standard => "Standard",
            SecurityLevel::Lockdown => "Lockdown",
            SecurityLevel::Development => "Development",
        }
    }
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

        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.remote.validate()
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/gangterm/config.toml` (~/.config/gangterm/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("gangterm").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/gangterm/` (~/.local/state/gangterm/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("gangterm")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/gangterm/gangterm.log` (~/.local/state/gangterm/gangterm.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("gangterm.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.remote.url.is_none());
        assert_eq!(config.remote.connect_timeout_secs, 10);
        assert!(!config.remote.auto_connect);
        assert_eq!(config.guardian.security_level, SecurityLevel::Standard);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_path_is_under_state_dir() {
        let path = Config::log_path();
        assert!(path.ends_with("gangterm/gangterm.log"));
        assert!(path.starts_with(Config::state_dir()));
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[remote]
url = "wss://honcho.example.ngrok-free.app"
connect_timeout_secs = 3
workspace_sync_target = "git@github.com:me/workspace.git"

[guardian]
security_level = "lockdown"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(
            config.remote.url.as_deref(),
            Some("wss://honcho.example.ngrok-free.app")
        );
        assert_eq!(config.remote.connect_timeout(), Duration::from_secs(3));
        assert_eq!(
            config.remote.workspace_sync_target.as_deref(),
            Some("git@github.com:me/workspace.git")
        );
        assert_eq!(config.guardian.security_level, SecurityLevel::Lockdown);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_security_level_wire_value() {
        let value = serde_json::to_value(SecurityLevel::Development).unwrap();
        assert_eq!(value, "Development");
        assert_eq!(SecurityLevel::Lockdown.label(), "Lockdown");
    }

    #[test]
    fn test_remote_url_validation() {
        assert!(validate_ws_url("ws://127.0.0.1:8765").is_ok());
        assert!(validate_ws_url("wss://backend.example.com/socket").is_ok());
        assert!(matches!(
            validate_ws_url("https://backend.example.com"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_ws_url("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_remote_config_validation() {
        let config = RemoteConfig {
            auto_connect: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RemoteConfig {
            url: Some("http://backend.example.com".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RemoteConfig {
            url: Some("ws://localhost:8765".to_string()),
            connect_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[remote]\nurl = \"ws://localhost:8765\"\nauto_connect = true\n")
            .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.remote.auto_connect);
        assert!(config.validate().is_ok());

        std::fs::write(&path, "[remote\nurl = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
