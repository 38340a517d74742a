//! Configuration management for the Cronitor client
//!
//! Settings come from code, a TOML file, or `CRONITOR_*` environment
//! variables. Values set explicitly always win over the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_PING_BASE_URL: &str = "https://cronitor.link";
pub const DEFAULT_API_BASE_URL: &str = "https://cronitor.io";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Client configuration shared by every monitor and event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API key, used in ping URLs and for basic auth on the monitor API
    pub api_key: String,

    /// Sent as the `Cronitor-Version` header when set
    pub api_version: Option<String>,

    /// Environment attached to pings that do not name one
    pub env: Option<String>,

    /// Request timeout in milliseconds; `None` means `DEFAULT_TIMEOUT_MS`
    pub timeout_ms: Option<u64>,

    /// Default YAML file for config sync
    pub config_path: Option<PathBuf>,

    /// Base URL of the telemetry (ping) endpoint
    pub ping_base_url: String,

    /// Base URL of the monitor management API
    pub api_base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_version: None,
            env: None,
            timeout_ms: None,
            config_path: None,
            ping_base_url: DEFAULT_PING_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Effective request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Point both endpoints at one host, e.g. a local mock server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.ping_base_url = base_url.clone();
        self.api_base_url = base_url;
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.to_string_lossy().to_string() })?;

        let config: ClientConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `CRONITOR_*` environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let config = Self::default().overlay_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback order: file -> env -> defaults
    pub fn load_with_fallback<P: AsRef<Path>>(config_path: Option<P>) -> ConfigResult<Self> {
        let mut config = ClientConfig::default();

        if let Some(path) = config_path {
            if path.as_ref().exists() {
                let content = fs::read_to_string(path.as_ref()).map_err(|_| ConfigError::PermissionDenied {
                    path: path.as_ref().to_string_lossy().to_string(),
                })?;
                config = toml::from_str(&content)?;
            }
        }

        let config = config.overlay_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Fill unset fields from the environment
    fn overlay_env(mut self) -> ConfigResult<Self> {
        if self.api_key.is_empty() {
            if let Ok(api_key) = std::env::var("CRONITOR_API_KEY") {
                self.api_key = api_key;
            }
        }

        if self.config_path.is_none() {
            if let Ok(path) = std::env::var("CRONITOR_CONFIG") {
                self.config_path = Some(PathBuf::from(path));
            }
        }

        if self.api_version.is_none() {
            self.api_version = std::env::var("CRONITOR_API_VERSION").ok();
        }

        if self.env.is_none() {
            self.env = std::env::var("CRONITOR_ENV").ok();
        }

        if self.timeout_ms.is_none() {
            if let Ok(timeout) = std::env::var("CRONITOR_TIMEOUT") {
                let timeout_ms = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "CRONITOR_TIMEOUT".to_string(),
                    value: timeout,
                })?;
                self.timeout_ms = Some(timeout_ms);
            }
        }

        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "api_key".to_string() });
        }

        if self.timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms".to_string(),
                value: "0".to_string(),
            });
        }

        for (field, url) in [("ping_base_url", &self.ping_base_url), ("api_base_url", &self.api_base_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: url.clone(),
                });
            }
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|_| ConfigError::PermissionDenied { path: parent.to_string_lossy().to_string() })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError { reason: e.to_string() })?;

        fs::write(path, content)
            .map_err(|_| ConfigError::PermissionDenied { path: path.to_string_lossy().to_string() })?;

        Ok(())
    }
}
