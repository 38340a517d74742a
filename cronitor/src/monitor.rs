//! Monitors: telemetry pings and management of a single monitored entity

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::client::{ApiContext, Cronitor};
use crate::error::{CronitorError, Outcome, Result};
use crate::transport::{ApiRequest, RequestBody};

/// Telemetry states a ping can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Run,
    Complete,
    Fail,
    Ok,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Run => "run",
            State::Complete => "complete",
            State::Fail => "fail",
            State::Ok => "ok",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric metric attached to a ping, sent as `name:value`
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: MetricValue,
}

/// Metric value. Counts stay integral so they are sent exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Count(u64),
    Number(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{}", n),
            MetricValue::Number(x) => write!(f, "{}", x),
        }
    }
}

impl From<u64> for MetricValue {
    fn from(n: u64) -> Self {
        MetricValue::Count(n)
    }
}

impl From<u32> for MetricValue {
    fn from(n: u32) -> Self {
        MetricValue::Count(n.into())
    }
}

impl From<i32> for MetricValue {
    fn from(n: i32) -> Self {
        match u64::try_from(n) {
            Ok(n) => MetricValue::Count(n),
            Err(_) => MetricValue::Number(n.into()),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(x: f64) -> Self {
        MetricValue::Number(x)
    }
}

/// Parameters of a single telemetry ping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PingParams {
    pub state: Option<State>,
    pub message: Option<String>,
    pub metrics: Vec<Metric>,
    pub series: Option<String>,
    pub host: Option<String>,
    pub env: Option<String>,
}

impl PingParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Append a metric; metrics are sent in insertion order
    pub fn metric(mut self, name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.metrics.push(Metric {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn series(mut self, series: impl Into<String>) -> Self {
        self.series = Some(series.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    /// Clean the parameters into query pairs.
    ///
    /// Empty strings count as absent. `stamp` is always present; `host` and
    /// `env` fall back to the given defaults.
    pub fn to_query(&self, default_env: Option<&str>, default_host: Option<&str>, stamp: f64) -> Vec<(String, String)> {
        let mut query = Vec::new();

        if let Some(state) = self.state {
            query.push(("state".to_string(), state.as_str().to_string()));
        }
        if let Some(message) = non_empty(self.message.as_deref()) {
            query.push(("message".to_string(), message.to_string()));
        }
        for metric in &self.metrics {
            query.push(("metric".to_string(), format!("{}:{}", metric.name, metric.value)));
        }
        if let Some(series) = non_empty(self.series.as_deref()) {
            query.push(("series".to_string(), series.to_string()));
        }
        if let Some(host) = non_empty(self.host.as_deref()).or(non_empty(default_host)) {
            query.push(("host".to_string(), host.to_string()));
        }
        query.push(("stamp".to_string(), stamp.to_string()));
        if let Some(env) = non_empty(self.env.as_deref()).or(non_empty(default_env)) {
            query.push(("env".to_string(), env.to_string()));
        }

        query
    }
}

impl From<&str> for PingParams {
    fn from(message: &str) -> Self {
        PingParams::new().message(message)
    }
}

impl From<String> for PingParams {
    fn from(message: String) -> Self {
        PingParams::new().message(message)
    }
}

impl From<State> for PingParams {
    fn from(state: State) -> Self {
        PingParams::new().state(state)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// `HOSTNAME` from the environment, else the system host name
fn local_host() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| hostname::get().ok().and_then(|h| h.into_string().ok()))
}

fn now_stamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorType {
    Job,
    Heartbeat,
    Check,
}

/// HTTP request performed by `check` monitors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,
}

/// Definition of a monitor for create/update requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub monitor_type: Option<MonitorType>,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notify: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<CheckRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realert_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl MonitorConfig {
    pub fn job(key: impl Into<String>, schedule: impl Into<String>) -> Self {
        Self {
            monitor_type: Some(MonitorType::Job),
            key: key.into(),
            schedule: Some(schedule.into()),
            ..Self::default()
        }
    }

    pub fn heartbeat(key: impl Into<String>) -> Self {
        Self {
            monitor_type: Some(MonitorType::Heartbeat),
            key: key.into(),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct PutRequest<'a> {
    monitors: &'a [MonitorConfig],
    rollback: bool,
}

#[derive(Deserialize)]
struct PutResponse {
    monitors: Vec<serde_json::Value>,
}

/// A single monitored entity, identified by its key
#[derive(Clone)]
pub struct Monitor {
    key: String,
    data: Option<serde_json::Value>,
    api: Arc<ApiContext>,
}

impl Monitor {
    /// Fails with [`CronitorError::InvalidMonitor`] when `key` is empty
    pub fn new(client: &Cronitor, key: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(CronitorError::InvalidMonitor("A key is required.".to_string()));
        }

        Ok(Self {
            key: key.to_string(),
            data: None,
            api: client.api.clone(),
        })
    }

    /// Create or update monitors. With `rollback` the request is only
    /// validated by the service.
    pub async fn put(client: &Cronitor, monitors: Vec<MonitorConfig>, rollback: bool) -> Result<Vec<Monitor>> {
        if monitors.is_empty() {
            return Err(CronitorError::MonitorNotCreated("Invalid monitor data.".to_string()));
        }

        let body = serde_json::to_value(PutRequest {
            monitors: &monitors,
            rollback,
        })?;
        let request = ApiRequest::put(client.api.monitor_url(None), RequestBody::Json(body));

        let response = client
            .api
            .transport
            .send(request)
            .await
            .and_then(|response| response.json::<PutResponse>())
            .map_err(|e| CronitorError::MonitorNotCreated(e.to_string()))?;

        response
            .monitors
            .into_iter()
            .map(|data| {
                let key = data.get("key").and_then(|k| k.as_str()).unwrap_or_default().to_string();
                let mut monitor = Monitor::new(client, &key)
                    .map_err(|_| CronitorError::MonitorNotCreated("Response monitor without a key.".to_string()))?;
                monitor.data = Some(data);
                Ok(monitor)
            })
            .collect()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Monitor data from the last [`Monitor::put`] or [`Monitor::load_data`]
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Fetch the monitor definition from the API
    pub async fn load_data(&mut self) -> Result<&serde_json::Value> {
        let response = self
            .api
            .transport
            .send(ApiRequest::get(self.api.monitor_url(Some(&self.key))))
            .await?;
        let data = self.data.insert(response.json()?);
        Ok(&*data)
    }

    /// Send one telemetry ping. Never returns an error; failures are logged.
    pub async fn ping(&self, params: impl Into<PingParams>) -> Outcome {
        let params = params.into();
        let host = local_host();
        let query = params.to_query(self.api.config.env.as_deref(), host.as_deref(), now_stamp());
        let request = ApiRequest::get(self.api.ping_url(&self.key)).with_query(query);

        match self.api.transport.send(request).await {
            Ok(_) => {
                debug!(monitor = %self.key, state = ?params.state, "Ping sent");
                Outcome::Success
            }
            Err(e) => {
                error!(monitor = %self.key, "Ping failed: {}", e);
                Outcome::failed(e)
            }
        }
    }

    /// Reset the monitor to a passing state
    pub async fn ok(&self, params: impl Into<PingParams>) -> Outcome {
        self.ping(params.into().state(State::Ok)).await
    }

    /// Pause alerting for `hours`; zero unpauses
    pub async fn pause(&self, hours: u32) -> Outcome {
        let url = format!("{}/pause/{}", self.api.monitor_url(Some(&self.key)), hours);

        match self.api.transport.send(ApiRequest::get(url)).await {
            Ok(_) => Outcome::Success,
            Err(e) => {
                error!(monitor = %self.key, hours, "Pause failed: {}", e);
                Outcome::failed(e)
            }
        }
    }

    pub async fn unpause(&self) -> Outcome {
        self.pause(0).await
    }

    pub async fn delete(&self) -> Outcome {
        match self
            .api
            .transport
            .send(ApiRequest::delete(self.api.monitor_url(Some(&self.key))))
            .await
        {
            Ok(_) => Outcome::Success,
            Err(e) => {
                error!(monitor = %self.key, "Delete failed: {}", e);
                Outcome::failed(e)
            }
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("key", &self.key)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}
