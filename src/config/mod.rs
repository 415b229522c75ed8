//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → gates built once at startup and shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the allowlist never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AccessConfig, AccessRuleConfig, AdminConfig, BackendConfig, GateConfig, LimitsConfig,
    ListenerConfig, ObservabilityConfig, RateLimitConfig, ResultSizeConfig,
};
