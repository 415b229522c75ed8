//! Gating pipeline.
//!
//! # Data Flow
//! ```text
//! InboundRequest (buffered, body classified)
//!     → AccessPolicy      (deny 403)
//!     → RateLimiter       (deny 429)
//!     → ResultSizeCapper  (rewrite size, never denies)
//!     → Forwarder         (backend response relayed verbatim)
//! ```
//!
//! # Design Decisions
//! - Every gate returns a `GateDecision`; the runner stops at the first `Deny`
//! - The runner holds no per-request state; only the rate limiter does
//! - No retries, no masking of upstream failures

pub mod decision;
pub mod request;
pub mod runner;

pub use decision::{Denial, GateDecision};
pub use request::{InboundRequest, Payload, SearchRequestPayload};
pub use runner::GatingPipeline;
