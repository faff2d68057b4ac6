//! Normalization of transport results into [`Outcome`]s

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{HttpResponse, TransportFailure};

/// `error` field of the synthesized 503 payload
pub const NO_RESPONSE: &str = "No response received from server";

/// `error` field of the synthesized 500 payload
pub const SETUP_FAILED: &str = "Request setup failed";

/// Uniform result of one request attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Remote or synthesized status code
    pub status: u16,
    /// Remote body verbatim, or the synthesized error payload
    pub data: Value,
    /// Response headers (empty for synthesized outcomes)
    pub headers: BTreeMap<String, String>,
}

impl Outcome {
    /// 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 4xx/5xx, synthesized statuses included
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status >= 400
    }

    fn synthesized(status: u16, error: &str, message: &str) -> Self {
        Self {
            status,
            data: json!({ "error": error, "message": message }),
            headers: BTreeMap::new(),
        }
    }
}

impl From<HttpResponse> for Outcome {
    fn from(response: HttpResponse) -> Self {
        Self {
            status: response.status,
            data: response.body,
            headers: response.headers,
        }
    }
}

/// Classify a transport result.
///
/// Priority: any response wins, then "sent but unanswered" (503), then
/// "never sent" (500).
#[must_use]
pub fn normalize(result: Result<HttpResponse, TransportFailure>) -> Outcome {
    match result {
        Ok(response)
        | Err(TransportFailure {
            response: Some(response),
            ..
        }) => response.into(),
        Err(TransportFailure {
            request_sent: true,
            message,
            ..
        }) => Outcome::synthesized(503, NO_RESPONSE, &message),
        Err(TransportFailure { message, .. }) => Outcome::synthesized(500, SETUP_FAILED, &message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn response(status: u16, body: Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: BTreeMap::from([("content-type".into(), "application/json".into())]),
            body,
        }
    }

    #[test]
    fn responses_pass_through_verbatim() {
        let outcome = normalize(Ok(response(404, json!({ "error_msg": "not found" }))));
        assert_eq!(outcome.status, 404);
        assert_eq!(outcome.data, json!({ "error_msg": "not found" }));
        assert_eq!(outcome.headers["content-type"], "application/json");
        assert!(outcome.is_failure());
    }

    #[test]
    fn response_beats_setup_failure() {
        let failure = TransportFailure {
            response: Some(response(500, json!({ "error_msg": "boom" }))),
            request_sent: false,
            message: "malformed request".into(),
        };
        let outcome = normalize(Err(failure));
        assert_eq!(outcome.status, 500);
        assert_eq!(outcome.data, json!({ "error_msg": "boom" }));
    }

    #[test]
    fn unanswered_request_is_503() {
        let outcome = normalize(Err(TransportFailure::no_response("operation timed out")));
        assert_eq!(outcome.status, 503);
        assert_eq!(
            outcome.data,
            json!({ "error": NO_RESPONSE, "message": "operation timed out" })
        );
        assert!(outcome.headers.is_empty());
    }

    #[test]
    fn unsent_request_is_500() {
        let outcome = normalize(Err(TransportFailure::setup("invalid header name")));
        assert_eq!(outcome.status, 500);
        assert_eq!(outcome.data["error"], SETUP_FAILED);
        assert!(!outcome.is_success());
    }
}
