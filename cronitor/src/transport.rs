//! HTTP transport used by monitors, events and config sync
//!
//! [`Transport`] is the only seam between the client and the network.
//! [`HttpTransport`] is the production implementation on top of `reqwest`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;

use crate::config::ClientConfig;
use crate::error::{ConfigError, CronitorError, Result};

const API_VERSION_HEADER: &str = "cronitor-version";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Yaml(String),
}

/// A single outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    /// Unencoded query pairs; repeated keys are sent repeated
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn put(url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// First value of a query key, if present
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// All values of a repeated query key, in order
    pub fn query_values(&self, key: &str) -> Vec<&str> {
        self.query.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str()).collect()
    }
}

/// A successful (2xx) response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T>(&self) -> Result<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Sends requests to the Cronitor service.
///
/// Implementations return `Err` for transport failures and for any
/// non-2xx status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// `reqwest` backed transport carrying the client's auth headers
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(default_headers(config)?)
            .build()?;

        Ok(Self { client })
    }
}

fn default_headers(config: &ClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("cronitor-rust/", env!("CARGO_PKG_VERSION"))),
    );

    let credentials = STANDARD.encode(format!("{}:", config.api_key));
    let auth = HeaderValue::from_str(&format!("Basic {}", credentials)).map_err(|_| ConfigError::InvalidValue {
        field: "api_key".to_string(),
        value: "<redacted>".to_string(),
    })?;
    headers.insert(AUTHORIZATION, auth);

    if let Some(version) = &config.api_version {
        let value = HeaderValue::from_str(version).map_err(|_| ConfigError::InvalidValue {
            field: "api_version".to_string(),
            value: version.clone(),
        })?;
        headers.insert(API_VERSION_HEADER, value);
    }

    Ok(headers)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        let builder = if request.query.is_empty() {
            builder
        } else {
            builder.query(&request.query)
        };

        let builder = match request.body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Yaml(text)) => builder.header(CONTENT_TYPE, "application/yaml").body(text),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CronitorError::Timeout
            } else {
                CronitorError::Http(e)
            }
        })?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(ApiResponse { status: status.as_u16(), body })
        } else {
            Err(CronitorError::Api {
                status: status.as_u16(),
                message: if body.is_empty() { status.to_string() } else { body },
            })
        }
    }
}
