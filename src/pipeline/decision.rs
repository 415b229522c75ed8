//! Gate outcomes.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};

use crate::error::GateError;

/// Terminal rejection produced by a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub status: StatusCode,
    pub body: &'static str,
    /// Short label used for logs and metrics.
    pub reason: &'static str,
}

impl Denial {
    pub const FORBIDDEN: Denial = Denial {
        status: StatusCode::FORBIDDEN,
        body: "Forbidden",
        reason: "policy",
    };

    pub const TOO_MANY_REQUESTS: Denial = Denial {
        status: StatusCode::TOO_MANY_REQUESTS,
        body: "Too Many Requests",
        reason: "rate_limit",
    };

    /// Render as a plain-text HTTP response.
    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

impl From<Denial> for GateError {
    fn from(denial: Denial) -> Self {
        if denial.status == StatusCode::TOO_MANY_REQUESTS {
            GateError::RateLimitExceeded
        } else {
            GateError::PolicyViolation
        }
    }
}

/// Outcome of a gate: continue with `T`, or stop with a [`Denial`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum GateDecision<T = ()> {
    Allow(T),
    Deny(Denial),
}

impl<T> GateDecision<T> {
    pub fn is_allow(&self) -> bool {
        matches!(self, GateDecision::Allow(_))
    }
}
