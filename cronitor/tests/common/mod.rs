//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cronitor::{ApiRequest, ApiResponse, ClientConfig, Cronitor, CronitorError, Result, Transport};

pub const API_KEY: &str = "test-key";

/// Transport that records every request instead of sending it
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<ApiRequest>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every following request fail with a 503
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request);

        if self.failing.load(Ordering::SeqCst) {
            Err(CronitorError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            })
        } else {
            Ok(ApiResponse {
                status: 200,
                body: String::new(),
            })
        }
    }
}

pub fn client(transport: Arc<RecordingTransport>) -> Cronitor {
    Cronitor::with_transport(ClientConfig::new(API_KEY).with_env("test"), transport)
}

/// Value of metric `name` in a ping, parsed from its `name:value` pair
pub fn metric(request: &ApiRequest, name: &str) -> Option<f64> {
    request
        .query_values("metric")
        .into_iter()
        .filter_map(|pair| pair.split_once(':'))
        .find(|(metric, _)| *metric == name)
        .and_then(|(_, value)| value.parse().ok())
}

/// `(count, error_count, duration)` of a metrics ping
pub fn flushed(request: &ApiRequest) -> (f64, f64, f64) {
    (
        metric(request, "count").expect("count metric"),
        metric(request, "error_count").expect("error_count metric"),
        metric(request, "duration").expect("duration metric"),
    )
}
