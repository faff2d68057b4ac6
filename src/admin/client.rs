//! reqwest-backed transport
//!
//! # Security
//!
//! The admin credential is attached as a header at send time. It is never
//! logged, never part of an error message and redacted from `Debug`.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde_json::Value;
use tracing::debug;

use super::{HttpRequest, HttpResponse, HttpTransport, TransportFailure};
use crate::Result;
use crate::config::{AdminConfig, GatewayConfig};

/// Header carrying the Admin API credential
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// HTTP client bound to one base URL
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    json_content_type: bool,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Client for the Admin API: credential header, admin prefix, JSON content type
    pub fn admin(config: &AdminConfig) -> Result<Self> {
        let mut client = Self::build(config.base_url(), config.resolve_api_key()?, config.timeout)?;
        client.json_content_type = true;
        Ok(client)
    }

    /// Client for the data-plane gateway: no credential
    pub fn gateway(config: &GatewayConfig, admin: &AdminConfig) -> Result<Self> {
        Self::build(config.base_url(admin), None, config.timeout)
    }

    fn build(base_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("apisix-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            json_content_type: false,
        })
    }

    /// Base URL requests are resolved against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportFailure> {
        let url = self.url_for(&request.path);
        let mut builder = self.client.request(request.method.clone(), &url);

        if self.json_content_type {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        // Invalid URLs, header names and values surface here
        let built = builder
            .build()
            .map_err(|e| TransportFailure::setup(e.to_string()))?;

        let start = Instant::now();
        let response = self.client.execute(built).await.map_err(|e| {
            debug!(method = %request.method, path = %request.path, error = %e, "Request failed");
            classify(&e)
        })?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        debug!(
            method = %request.method,
            path = %request.path,
            status,
            elapsed_ms = start.elapsed().as_millis(),
            "Response received"
        );

        match response.bytes().await {
            Ok(bytes) => Ok(HttpResponse {
                status,
                headers,
                body: parse_body(&bytes),
            }),
            Err(e) => Err(TransportFailure {
                response: Some(HttpResponse {
                    status,
                    headers,
                    body: Value::Null,
                }),
                request_sent: true,
                message: e.to_string(),
            }),
        }
    }
}

/// Builder errors never left the process; everything else did
fn classify(error: &reqwest::Error) -> TransportFailure {
    if error.is_builder() {
        TransportFailure::setup(error.to_string())
    } else {
        TransportFailure::no_response(error.to_string())
    }
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// JSON if it parses, the text otherwise, `null` when empty.
///
/// Numbers keep their source text (`1.50`, integers past 64 bits).
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
