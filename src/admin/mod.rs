//! Transport client for the Admin API and the data-plane gateway.
//!
//! [`HttpTransport`] is the seam between request planning and the network.
//! [`HttpClient`] implements it with reqwest; tests substitute fakes.

mod client;
mod outcome;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

pub use client::HttpClient;
pub use outcome::{NO_RESPONSE, Outcome, SETUP_FAILED, normalize};

/// One outbound HTTP call, relative to the transport's base URL
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP verb
    pub method: Method,
    /// Path below the base URL (leading `/`), or an absolute URL
    pub path: String,
    /// Query parameters in send order
    pub query: Vec<(String, String)>,
    /// Extra headers, added verbatim
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Request without query, headers or body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Attach a JSON body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append a query parameter
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Path plus encoded query string, as it goes on the wire
    #[must_use]
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.query {
            serializer.append_pair(name, value);
        }
        format!("{}?{}", self.path, serializer.finish())
    }
}

/// A response received from the remote, whatever its status
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response headers (lowercase names)
    pub headers: BTreeMap<String, String>,
    /// Body: parsed JSON, the raw text if it is not JSON, `null` if empty
    pub body: Value,
}

/// Why a call did not produce a clean response.
///
/// `response` is set when the remote answered but the exchange still
/// failed (e.g. the body could not be read). `request_sent` separates
/// "no answer" from "never left this process".
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFailure {
    /// Response, if one arrived
    pub response: Option<HttpResponse>,
    /// Whether the request was handed to the network
    pub request_sent: bool,
    /// Diagnostic detail (never contains the credential)
    pub message: String,
}

impl TransportFailure {
    /// Request could not be built or sent
    pub fn setup(message: impl Into<String>) -> Self {
        Self {
            response: None,
            request_sent: false,
            message: message.into(),
        }
    }

    /// Request went out, nothing came back
    pub fn no_response(message: impl Into<String>) -> Self {
        Self {
            response: None,
            request_sent: true,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportFailure {}

/// Executes [`HttpRequest`]s against one remote.
///
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request; exactly one attempt, no retries
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_and_query_encodes_values_in_order() {
        let request = HttpRequest::new(Method::GET, "/routes")
            .with_query("page", "1")
            .with_query("page_size", "10")
            .with_query("name", "a b&c");
        assert_eq!(
            request.path_and_query(),
            "/routes?page=1&page_size=10&name=a+b%26c"
        );
        assert_eq!(HttpRequest::new(Method::GET, "/x").path_and_query(), "/x");
    }
}
