//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the search gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address, proxy trust).
    pub listener: ListenerConfig,

    /// Search backend the approved requests are forwarded to.
    pub backend: BackendConfig,

    /// Source address and method allowlist.
    pub access: AccessConfig,

    /// Per-address fixed-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Result-set size bounds for retrieval requests.
    pub result_size: ResultSizeConfig,

    /// Request body limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Management API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Take the source address from the left-most `X-Forwarded-For` entry
    /// instead of the TCP peer. Only enable behind a trusted load balancer.
    pub trust_proxy: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trust_proxy: false,
        }
    }
}

/// Search backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend address (e.g., "127.0.0.1:9200").
    pub address: String,

    /// Deadline for a complete upstream exchange in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:9200".to_string(),
            timeout_secs: 30,
        }
    }
}

/// A single allowlist entry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccessRuleConfig {
    /// Literal source address, or `*` to match any source.
    pub address: String,

    /// Methods this address may use. Compared case-insensitively.
    pub allowed_methods: Vec<String>,
}

/// Allowlist configuration. Rules are evaluated in the order given.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    pub rules: Vec<AccessRuleConfig>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            rules: vec![AccessRuleConfig {
                address: "*".to_string(),
                allowed_methods: vec!["GET".to_string()],
            }],
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Length of one counting window in milliseconds.
    pub window_ms: u64,

    /// Requests allowed per address within one window.
    pub max_requests: u64,

    /// How often expired records are pruned, in milliseconds (0 = never).
    pub sweep_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 15 * 60 * 1000,
            max_requests: 5,
            sweep_interval_ms: 60_000,
        }
    }
}

/// Result-size capping configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResultSizeConfig {
    /// Size used when the client omits one or asks for too many results.
    pub default_size: i64,

    /// Largest size a client may request.
    pub max_size: i64,

    /// Methods treated as read-only retrieval (capped and JSON-parsed).
    pub retrieval_methods: Vec<String>,
}

impl Default for ResultSizeConfig {
    fn default() -> Self {
        Self {
            default_size: 1,
            max_size: 1000,
            retrieval_methods: vec!["GET".to_string()],
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
