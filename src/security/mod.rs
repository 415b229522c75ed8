//! Security subsystem: the three request gates.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (source address + method allowlist)
//!     → rate_limit.rs (per-address fixed-window counter)
//!     → result_size.rs (bound the requested result-set size)
//!     → Pass to forwarder
//! ```
//!
//! # Design Decisions
//! - Fail closed: an address matching no rule is denied
//! - Gates return a `GateDecision` instead of calling a continuation
//! - No trust in client-supplied sizes

pub mod access_control;
pub mod rate_limit;
pub mod result_size;

use axum::http::Method;

pub use access_control::{AccessPolicy, AccessRule, WILDCARD};
pub use rate_limit::{RateLimitRecord, RateLimiter};
pub use result_size::ResultSizeCapper;

/// Parse a configured method name, ignoring case.
pub fn parse_method(name: &str) -> Option<Method> {
    Method::from_bytes(name.trim().to_ascii_uppercase().as_bytes()).ok()
}

/// Case-insensitive method comparison.
pub fn same_method(a: &Method, b: &Method) -> bool {
    a.as_str().eq_ignore_ascii_case(b.as_str())
}
