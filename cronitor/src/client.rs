//! The `Cronitor` client handle
//!
//! Holds the configuration and transport shared by every [`Monitor`] and
//! [`Event`] created from it.

use std::fmt;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::event::{Event, EventOptions};
use crate::monitor::Monitor;
use crate::transport::{HttpTransport, Transport};

pub(crate) struct ApiContext {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<dyn Transport>,
}

impl ApiContext {
    pub(crate) fn ping_url(&self, key: &str) -> String {
        format!(
            "{}/ping/{}/{}",
            self.config.ping_base_url.trim_end_matches('/'),
            self.config.api_key,
            key
        )
    }

    pub(crate) fn monitor_url(&self, key: Option<&str>) -> String {
        let base = format!("{}/api/monitors", self.config.api_base_url.trim_end_matches('/'));
        match key {
            Some(key) => format!("{}/{}", base, key),
            None => base,
        }
    }
}

/// Entry point of the SDK; cheap to clone
#[derive(Clone)]
pub struct Cronitor {
    pub(crate) api: Arc<ApiContext>,
}

impl Cronitor {
    /// Create a client talking to the Cronitor service over HTTP
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client from `CRONITOR_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            api: Arc::new(ApiContext { config, transport }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.api.config
    }

    pub fn ping_url(&self, key: &str) -> String {
        self.api.ping_url(key)
    }

    pub fn monitor_url(&self, key: Option<&str>) -> String {
        self.api.monitor_url(key)
    }

    pub fn monitor(&self, key: &str) -> Result<Monitor> {
        Monitor::new(self, key)
    }

    /// Start a tick aggregating [`Event`] for `key`
    pub fn event(&self, key: &str, options: EventOptions) -> Result<Event> {
        Event::new(self, key, options)
    }

    /// A fresh correlation id grouping the pings of one run
    pub fn new_series(&self) -> String {
        format!("{:08x}", rand::random::<u32>())
    }
}

impl fmt::Debug for Cronitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cronitor")
            .field("env", &self.api.config.env)
            .field("ping_base_url", &self.api.config.ping_base_url)
            .field("api_base_url", &self.api.config.api_base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = Cronitor::new(ClientConfig::new("abc123")).unwrap();
        assert_eq!(client.ping_url("nightly-job"), "https://cronitor.link/ping/abc123/nightly-job");
        assert_eq!(client.monitor_url(None), "https://cronitor.io/api/monitors");
        assert_eq!(client.monitor_url(Some("nightly-job")), "https://cronitor.io/api/monitors/nightly-job");
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let client = Cronitor::new(ClientConfig::new("abc123").with_base_url("http://localhost:8080/")).unwrap();
        assert_eq!(client.ping_url("job"), "http://localhost:8080/ping/abc123/job");
    }

    #[test]
    fn test_new_series() {
        let client = Cronitor::new(ClientConfig::new("abc123")).unwrap();
        let series = client.new_series();
        assert_eq!(series.len(), 8);
        assert!(series.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_new_rejects_missing_key() {
        assert!(Cronitor::new(ClientConfig::default()).is_err());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = Cronitor::new(ClientConfig::new("secret-key")).unwrap();
        assert!(!format!("{:?}", client).contains("secret-key"));
    }
}
