use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::config::AccessRuleConfig;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub backend: String,
}

#[derive(Serialize)]
pub struct PolicySummary {
    pub rules: Vec<AccessRuleConfig>,
    pub default_size: i64,
    pub max_size: i64,
    pub retrieval_methods: Vec<String>,
}

#[derive(Serialize)]
pub struct RateLimitSummary {
    pub tracked_addresses: usize,
    pub window_ms: u64,
    pub max_requests: u64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        backend: state.config.backend.address.clone(),
    })
}

pub async fn get_policy(State(state): State<AdminState>) -> Json<PolicySummary> {
    let capper = state.pipeline.capper();
    Json(PolicySummary {
        rules: state.config.access.rules.clone(),
        default_size: capper.default_size(),
        max_size: capper.max_size(),
        retrieval_methods: state.config.result_size.retrieval_methods.clone(),
    })
}

pub async fn get_rate_limits(State(state): State<AdminState>) -> Json<RateLimitSummary> {
    let limiter = state.pipeline.limiter();
    Json(RateLimitSummary {
        tracked_addresses: limiter.tracked_addresses(),
        window_ms: limiter.window().as_millis() as u64,
        max_requests: limiter.max_requests(),
    })
}
