//! Search gate: a policy gateway in front of a search backend.
//!
//! Each request passes an address/method allowlist, a per-address rate
//! limiter and a result-size capper before it is relayed to the backend.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod security;

pub use config::GateConfig;
pub use error::GateError;
pub use http::GateServer;
pub use lifecycle::Shutdown;
pub use pipeline::{GateDecision, GatingPipeline};
