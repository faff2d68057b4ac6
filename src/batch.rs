//! Batched request executor for the data-plane gateway.
//!
//! Each descriptor expands into `repeatCount` independent attempts. All
//! attempts run concurrently; results come back in descriptor order, then
//! repetition order, whatever order they completed in. The repeat counts of
//! one batch are capped; an oversized batch is rejected before it starts.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::admin::{HttpRequest, HttpTransport, Outcome, normalize};
use crate::schema::ValidationError;

/// One HTTP call, optionally repeated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Path below the gateway base URL (or an absolute URL)
    pub path: String,
    /// HTTP method (case-insensitive)
    pub method: String,
    /// JSON body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Headers added verbatim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Number of independent attempts (at least 1)
    #[serde(rename = "repeatCount", default = "default_repeat")]
    pub repeat_count: u32,
}

fn default_repeat() -> u32 {
    1
}

impl RequestDescriptor {
    /// Single `GET` of `path`
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: "GET".into(),
            data: None,
            headers: BTreeMap::new(),
            repeat_count: 1,
        }
    }

    /// Set the repeat count
    #[must_use]
    pub fn repeated(mut self, count: u32) -> Self {
        self.repeat_count = count;
        self
    }

    fn to_request(&self, index: usize) -> Result<HttpRequest, ValidationError> {
        let method = Method::from_bytes(self.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| {
                ValidationError::Arguments(format!(
                    "requests[{index}].method: invalid HTTP method '{}'",
                    self.method
                ))
            })?;
        if self.path.trim().is_empty() {
            return Err(ValidationError::Arguments(format!(
                "requests[{index}].path must not be empty"
            )));
        }
        Ok(HttpRequest {
            method,
            path: self.path.clone(),
            query: Vec::new(),
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            body: self.data.clone(),
        })
    }
}

/// Aggregate counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Attempts made
    pub total: usize,
    /// 2xx outcomes
    pub successful: usize,
    /// Outcomes with status >= 400
    pub failed: usize,
}

/// Results of a batch, in descriptor then repetition order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// One outcome per attempt
    pub results: Vec<Outcome>,
    /// Counts over `results`
    pub summary: BatchSummary,
}

impl BatchReport {
    fn from_results(results: Vec<Outcome>) -> Self {
        let summary = BatchSummary {
            total: results.len(),
            successful: results.iter().filter(|o| o.is_success()).count(),
            failed: results.iter().filter(|o| o.is_failure()).count(),
        };
        Self { results, summary }
    }
}

/// Attempts one batch may expand to unless configured otherwise
pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

/// Fans request descriptors out over a transport
#[derive(Clone)]
pub struct BatchExecutor {
    transport: Arc<dyn HttpTransport>,
    max_attempts: usize,
}

impl BatchExecutor {
    /// Executor over `transport` (normally a gateway-mode `HttpClient`)
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Cap the total attempts of one batch
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Run every attempt concurrently and report them all.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] before any request is sent if a
    /// descriptor has `repeatCount` 0, an invalid method or an empty path,
    /// or if the repeat counts add up to more than the attempt ceiling.
    pub async fn execute(
        &self,
        descriptors: &[RequestDescriptor],
    ) -> Result<BatchReport, ValidationError> {
        let mut total: u64 = 0;
        for (index, descriptor) in descriptors.iter().enumerate() {
            if descriptor.repeat_count == 0 {
                return Err(ValidationError::Arguments(format!(
                    "requests[{index}].repeatCount must be at least 1"
                )));
            }
            total += u64::from(descriptor.repeat_count);
        }
        if total > u64::try_from(self.max_attempts).unwrap_or(u64::MAX) {
            return Err(ValidationError::Arguments(format!(
                "requests expand to {total} attempts; at most {} are allowed per call",
                self.max_attempts
            )));
        }

        let mut attempts = Vec::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            let request = descriptor.to_request(index)?;
            for _ in 0..descriptor.repeat_count {
                attempts.push(request.clone());
            }
        }

        let start = Instant::now();
        debug!(attempts = attempts.len(), "Dispatching gateway batch");
        let futures = attempts.into_iter().map(|request| {
            let transport = Arc::clone(&self.transport);
            async move { normalize(transport.send(request).await) }
        });
        let report = BatchReport::from_results(join_all(futures).await);

        info!(
            total = report.summary.total,
            successful = report.summary.successful,
            failed = report.summary.failed,
            elapsed_ms = start.elapsed().as_millis(),
            "Gateway batch completed"
        );
        Ok(report)
    }
}
