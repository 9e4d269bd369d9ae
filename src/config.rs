//! Configuration management for Murmur
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! Precedence, lowest first: built-in defaults, the YAML file, `MURMUR_*`
//! environment variables, command-line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MurmurError, Result};
use crate::render::DEFAULT_TIME_FORMAT;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Main configuration structure for Murmur
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Messenger server endpoints
    #[serde(default)]
    pub server: ServerConfig,
    /// Credentials
    #[serde(default)]
    pub auth: AuthConfig,
    /// Terminal presentation
    #[serde(default)]
    pub display: DisplayConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Messenger server endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the HTTP API, including any path prefix
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// WebSocket endpoint of the signal channel
    #[serde(default = "default_socket_url")]
    pub socket_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_api_url() -> String {
    "http://localhost:3001/api".to_string()
}

fn default_socket_url() -> String {
    "ws://localhost:3001/signals".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            socket_url: default_socket_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Credentials sent with every request and the socket upgrade
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session token, sent as a bearer token
    #[serde(default)]
    pub token: Option<String>,
}

/// Terminal presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// chrono format string for message times
    #[serde(default = "default_time_format")]
    pub time_format: String,

    /// Mark the message the other participant last read
    #[serde(default = "default_show_read_receipts")]
    pub show_read_receipts: bool,
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

fn default_show_read_receipts() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            time_format: default_time_format(),
            show_read_receipts: default_show_read_receipts(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,

    /// Also append log lines to this file
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Explicit config path, or `None` to search the default
    ///   locations
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: Option<&str>, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = match Self::resolve_path(path) {
            Some(path) => Self::from_file(&path)?,
            None => {
                tracing::warn!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Picks the config file to read.
    ///
    /// An explicit path is used if it exists. Otherwise `config/config.yaml`,
    /// then `config.yaml` in the platform config directory.
    pub fn resolve_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            tracing::warn!("Config file not found at {}", path.display());
        }

        let local = PathBuf::from(DEFAULT_CONFIG_PATH);
        if local.exists() {
            return Some(local);
        }

        directories::ProjectDirs::from("", "", "murmur")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Reads and parses a YAML config file.
    ///
    /// # Errors
    ///
    /// Returns `MurmurError::Config` if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MurmurError::Config(format!("Failed to read config file: {}", e)))?;
        let config = serde_yaml::from_str(&contents)
            .map_err(|e| MurmurError::Config(format!("Failed to parse config: {}", e)))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_url) = std::env::var("MURMUR_API_URL") {
            self.server.api_url = api_url;
        }

        if let Ok(socket_url) = std::env::var("MURMUR_SOCKET_URL") {
            self.server.socket_url = socket_url;
        }

        if let Ok(timeout) = std::env::var("MURMUR_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.server.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid MURMUR_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(token) = std::env::var("MURMUR_TOKEN") {
            self.auth.token = Some(token);
        }

        if let Ok(level) = std::env::var("MURMUR_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("MURMUR_JSON_LOGS") {
            match json.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.logging.json_format = true,
                "0" | "false" | "no" => self.logging.json_format = false,
                _ => tracing::warn!("Invalid MURMUR_JSON_LOGS: {}", json),
            }
        }

        if let Ok(file) = std::env::var("MURMUR_LOG_FILE") {
            self.logging.file_path = Some(PathBuf::from(file));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let api_url = url::Url::parse(&self.server.api_url).map_err(|e| {
            MurmurError::Config(format!("Invalid server.api_url '{}': {}", self.server.api_url, e))
        })?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(MurmurError::Config(format!(
                "server.api_url must use http or https, got {}",
                api_url.scheme()
            ))
            .into());
        }

        let socket_url = url::Url::parse(&self.server.socket_url).map_err(|e| {
            MurmurError::Config(format!(
                "Invalid server.socket_url '{}': {}",
                self.server.socket_url, e
            ))
        })?;
        if !matches!(socket_url.scheme(), "ws" | "wss") {
            return Err(MurmurError::Config(format!(
                "server.socket_url must use ws or wss, got {}",
                socket_url.scheme()
            ))
            .into());
        }

        if self.server.timeout_seconds == 0 || self.server.timeout_seconds > 300 {
            return Err(MurmurError::Config(
                "server.timeout_seconds must be between 1 and 300".to_string(),
            )
            .into());
        }

        if self.display.time_format.trim().is_empty() {
            return Err(
                MurmurError::Config("display.time_format cannot be empty".to_string()).into(),
            );
        }

        if self.logging.level.trim().is_empty() {
            return Err(MurmurError::Config("logging.level cannot be empty".to_string()).into());
        }

        Ok(())
    }

    /// Parsed socket URL. Call after [`Config::validate`].
    ///
    /// # Errors
    ///
    /// Returns `MurmurError::Config` if the URL does not parse
    pub fn socket_url(&self) -> Result<url::Url> {
        url::Url::parse(&self.server.socket_url).map_err(|e| {
            MurmurError::Config(format!("Invalid server.socket_url: {}", e)).into()
        })
    }
}
