//! Result-set size capping for retrieval requests.

use axum::http::Method;

use crate::config::ResultSizeConfig;
use crate::pipeline::SearchRequestPayload;
use crate::security::{parse_method, same_method};

/// Rewrites the `size` of retrieval payloads into `[1, max_size]`.
///
/// Missing, non-positive and oversized values all become `default_size`.
/// Oversized requests fall back to the default rather than to `max_size`,
/// so a client asking for too much gets the small page, not the largest one.
#[derive(Debug, Clone)]
pub struct ResultSizeCapper {
    default_size: i64,
    max_size: i64,
    retrieval_methods: Vec<Method>,
}

impl ResultSizeCapper {
    pub fn new(default_size: i64, max_size: i64, retrieval_methods: Vec<Method>) -> Self {
        Self {
            default_size,
            max_size,
            retrieval_methods,
        }
    }

    pub fn from_config(config: &ResultSizeConfig) -> Self {
        let methods = config
            .retrieval_methods
            .iter()
            .filter_map(|name| parse_method(name))
            .collect();
        Self::new(config.default_size, config.max_size, methods)
    }

    pub fn default_size(&self) -> i64 {
        self.default_size
    }

    pub fn max_size(&self) -> i64 {
        self.max_size
    }

    /// Whether `method` carries a search payload that should be capped.
    pub fn is_retrieval(&self, method: &Method) -> bool {
        self.retrieval_methods.iter().any(|m| same_method(m, method))
    }

    /// The size a retrieval request is allowed to ask for.
    pub fn capped_size(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(size) if size > 0 && size <= self.max_size => size,
            _ => self.default_size,
        }
    }

    /// Never denies. Non-retrieval methods pass through unmodified.
    pub fn apply(&self, method: &Method, mut payload: SearchRequestPayload) -> SearchRequestPayload {
        if self.is_retrieval(method) {
            let requested = payload.size();
            let capped = self.capped_size(requested);
            if requested != Some(capped) {
                tracing::debug!(requested = ?requested, capped, "Rewriting result size");
                payload.set_size(capped);
            }
        }
        payload
    }
}
