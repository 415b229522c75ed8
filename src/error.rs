//! Error types for the search gate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Per-request failures. None of these is fatal to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Source address or method not permitted by the allowlist.
    #[error("Forbidden")]
    PolicyViolation,

    /// Too many requests from one address within the current window.
    #[error("Too Many Requests")]
    RateLimitExceeded,

    /// Retrieval body is not a JSON object with an integer `size`.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Request body exceeds the configured limit.
    #[error("Payload Too Large")]
    PayloadTooLarge,

    /// The backend could not be reached.
    #[error("Upstream request failed")]
    UpstreamUnavailable,

    /// The backend did not answer within the deadline.
    #[error("Upstream request timed out")]
    UpstreamTimeout,
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::PolicyViolation => StatusCode::FORBIDDEN,
            GateError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            GateError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            GateError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GateError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            GateError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GateError::PolicyViolation.status(), StatusCode::FORBIDDEN);
        assert_eq!(GateError::RateLimitExceeded.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            GateError::MalformedPayload("size".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(GateError::UpstreamTimeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_plain_text_bodies() {
        assert_eq!(GateError::PolicyViolation.to_string(), "Forbidden");
        assert_eq!(GateError::RateLimitExceeded.to_string(), "Too Many Requests");
    }
}
