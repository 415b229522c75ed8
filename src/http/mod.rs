//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → request.rs (resolve source address)
//!     → body buffered and classified (pipeline::InboundRequest)
//!     → pipeline gates
//!     → forwarder.rs (relay to backend, stream response back)
//! ```

pub mod forwarder;
pub mod request;
pub mod server;

pub use forwarder::{Forwarder, HyperForwarder};
pub use request::{source_address, MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, GateServer};
