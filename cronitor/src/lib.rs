//! Cronitor client library
//!
//! Reports job lifecycle and tick metrics to Cronitor, manages monitors over
//! the REST API, and syncs monitor definitions from YAML files.
//!
//! The [`Event`] type aggregates high-frequency ticks and errors into one
//! metrics ping per interval; everything else is a thin mapping onto the
//! service's HTTP endpoints.

pub mod client;
pub mod config;
pub mod config_sync;
pub mod error;
pub mod event;
pub mod job;
pub mod monitor;
pub mod schedule;
pub mod transport;

// Re-export commonly used types
pub use client::Cronitor;
pub use config::ClientConfig;
pub use error::{ConfigError, CronitorError, Outcome, Result};
pub use event::{Counts, Event, EventOptions};
pub use job::{JobError, MAX_MESSAGE_CHARS};
pub use monitor::{Metric, MetricValue, Monitor, MonitorConfig, MonitorType, PingParams, State};
pub use schedule::Scheduler;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, RequestBody, Transport};
