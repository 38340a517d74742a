//! Error handling for the Cronitor client
//!
//! Construction and management calls surface a [`CronitorError`]. Telemetry
//! calls that must never fail their caller (pings, pauses, deletes, event
//! flushes) report an [`Outcome`] instead.

use std::fmt;
use std::io;

use thiserror::Error;

/// The main error type for the Cronitor client
#[derive(Error, Debug)]
pub enum CronitorError {
    /// A monitor was requested without a usable key
    #[error("Invalid monitor: {0}")]
    InvalidMonitor(String),

    /// The monitor API rejected a create/update request
    #[error("Monitor not created: {0}")]
    MonitorNotCreated(String),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport level HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Background work was requested outside of a Tokio runtime
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Cron scheduling errors
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Request timed out")]
    Timeout,
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration parsing error: {reason}")]
    ParseError { reason: String },

    #[error("Configuration file permission denied: {path}")]
    PermissionDenied { path: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CronitorError>;

/// A specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl CronitorError {
    /// Check if retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CronitorError::Timeout => true,
            CronitorError::Http(e) => e.is_timeout() || e.is_connect(),
            CronitorError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CronitorError::InvalidMonitor(_) => "invalid_monitor",
            CronitorError::MonitorNotCreated(_) => "monitor_not_created",
            CronitorError::Config(_) => "config",
            CronitorError::Http(_) => "http",
            CronitorError::Api { .. } => "api",
            CronitorError::Json(_) => "json",
            CronitorError::Yaml(_) => "yaml",
            CronitorError::Io(_) => "io",
            CronitorError::Runtime(_) => "runtime",
            CronitorError::Scheduler(_) => "scheduler",
            CronitorError::Timeout => "timeout",
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::ParseError { reason: e.to_string() }
    }
}

/// Result of a telemetry call that is never allowed to fail its caller.
///
/// Transport errors are caught at the monitor boundary, logged, and folded
/// into [`Outcome::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed { reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub(crate) fn failed(reason: impl fmt::Display) -> Self {
        Outcome::Failed { reason: reason.to_string() }
    }
}

impl From<Outcome> for bool {
    fn from(outcome: Outcome) -> bool {
        outcome.is_success()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        let error = CronitorError::InvalidMonitor("A key is required.".to_string());
        assert_eq!(error.category(), "invalid_monitor");
        assert!(!error.is_retryable());

        let error = CronitorError::Api { status: 503, message: "unavailable".to_string() };
        assert_eq!(error.category(), "api");
        assert!(error.is_retryable());

        let error = CronitorError::Api { status: 404, message: "not found".to_string() };
        assert!(!error.is_retryable());

        assert!(CronitorError::Timeout.is_retryable());
    }

    #[test]
    fn test_config_error_conversion() {
        let error: CronitorError = ConfigError::MissingField { field: "api_key".to_string() }.into();
        assert!(matches!(error, CronitorError::Config(ConfigError::MissingField { .. })));
        assert_eq!(error.to_string(), "Configuration error: Missing required configuration field: api_key");
    }

    #[test]
    fn test_outcome() {
        assert!(Outcome::Success.is_success());
        let failed = Outcome::failed("connection refused");
        assert!(!failed.is_success());
        assert_eq!(failed.to_string(), "failed: connection refused");
        assert!(!bool::from(failed));
    }
}
