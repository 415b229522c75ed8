//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, method names and numeric ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;

use crate::config::schema::GateConfig;
use crate::security::parse_method;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("access.rules[{index}]: address must not be empty")]
    EmptyRuleAddress { index: usize },

    #[error("access.rules[{index}]: allowed_methods must not be empty")]
    NoAllowedMethods { index: usize },

    #[error("{field}: invalid HTTP method '{value}'")]
    InvalidMethod { field: String, value: String },

    #[error("backend.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("rate_limit.window_ms must be greater than zero")]
    ZeroWindow,

    #[error("result_size.default_size must be at least 1 (got {0})")]
    DefaultSizeTooSmall(i64),

    #[error("result_size.default_size ({default}) exceeds result_size.max_size ({max})")]
    DefaultAboveMax { default: i64, max: i64 },

    #[error("result_size.max_size must be below {max}", max = i64::MAX)]
    MaxSizeTooLarge,

    #[error("result_size.retrieval_methods must not be empty")]
    NoRetrievalMethods,

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingAdminKey,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if !is_backend_authority(&config.backend.address) {
        errors.push(ValidationError::InvalidAddress {
            field: "backend.address",
            value: config.backend.address.clone(),
        });
    }
    if config.backend.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.observability.metrics_enabled {
        check_addr(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }

    for (index, rule) in config.access.rules.iter().enumerate() {
        if rule.address.trim().is_empty() {
            errors.push(ValidationError::EmptyRuleAddress { index });
        }
        if rule.allowed_methods.is_empty() {
            errors.push(ValidationError::NoAllowedMethods { index });
        }
        for method in &rule.allowed_methods {
            if parse_method(method).is_none() {
                errors.push(ValidationError::InvalidMethod {
                    field: format!("access.rules[{}].allowed_methods", index),
                    value: method.clone(),
                });
            }
        }
    }

    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow);
    }

    let sizes = &config.result_size;
    if sizes.default_size < 1 {
        errors.push(ValidationError::DefaultSizeTooSmall(sizes.default_size));
    } else if sizes.default_size > sizes.max_size {
        errors.push(ValidationError::DefaultAboveMax {
            default: sizes.default_size,
            max: sizes.max_size,
        });
    }
    // sizes past the i64 range saturate to i64::MAX and must stay over the cap
    if sizes.max_size == i64::MAX {
        errors.push(ValidationError::MaxSizeTooLarge);
    }
    if sizes.retrieval_methods.is_empty() {
        errors.push(ValidationError::NoRetrievalMethods);
    }
    for method in &sizes.retrieval_methods {
        if parse_method(method).is_none() {
            errors.push(ValidationError::InvalidMethod {
                field: "result_size.retrieval_methods".to_string(),
                value: method.clone(),
            });
        }
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Backends may be named by host (e.g. a container name), but need a port.
fn is_backend_authority(value: &str) -> bool {
    value
        .parse::<Authority>()
        .map(|authority| authority.port_u16().is_some())
        .unwrap_or(false)
}
