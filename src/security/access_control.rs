//! Source address and method allowlisting.
//!
//! Rules are checked in configured order and the first rule whose address
//! and method both match allows the request. Put trusted addresses first
//! and the `*` rule last: a trusted host can then be granted POST/DELETE
//! while everyone else stays read-only.

use axum::http::Method;

use crate::config::AccessConfig;
use crate::pipeline::{Denial, GateDecision};
use crate::security::{parse_method, same_method};

/// Rule address that matches every source.
pub const WILDCARD: &str = "*";

/// One allowlist entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub address: String,
    pub allowed_methods: Vec<Method>,
}

impl AccessRule {
    pub fn new(address: impl Into<String>, allowed_methods: Vec<Method>) -> Self {
        Self {
            address: address.into(),
            allowed_methods,
        }
    }

    fn matches_address(&self, source: &str) -> bool {
        self.address == WILDCARD || self.address == source
    }

    fn allows(&self, method: &Method) -> bool {
        self.allowed_methods.iter().any(|m| same_method(m, method))
    }
}

/// Ordered, immutable allowlist.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    pub fn new(rules: Vec<AccessRule>) -> Self {
        Self { rules }
    }

    /// Build the policy from validated configuration.
    pub fn from_config(config: &AccessConfig) -> Self {
        let rules = config
            .rules
            .iter()
            .map(|rule| {
                let methods = rule
                    .allowed_methods
                    .iter()
                    .filter_map(|name| {
                        let parsed = parse_method(name);
                        if parsed.is_none() {
                            tracing::warn!(address = %rule.address, method = %name, "Ignoring invalid method in access rule");
                        }
                        parsed
                    })
                    .collect();
                AccessRule::new(rule.address.trim(), methods)
            })
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    /// First-match-wins evaluation. No match (or an empty policy) denies with 403.
    pub fn evaluate(&self, source: &str, method: &Method) -> GateDecision {
        let matched = self
            .rules
            .iter()
            .any(|rule| rule.matches_address(source) && rule.allows(method));

        if matched {
            GateDecision::Allow(())
        } else {
            GateDecision::Deny(Denial::FORBIDDEN)
        }
    }
}
