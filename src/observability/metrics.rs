//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_requests_total` (counter): requests by method, status
//! - `gate_request_duration_seconds` (histogram): end-to-end latency
//! - `gate_denied_total` (counter): denials by reason (policy, rate_limit)
//! - `gate_size_rewritten_total` (counter): retrieval bodies whose size was rewritten
//! - `gate_rate_limit_tracked_addresses` (gauge): addresses held by the limiter

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!("gate_requests_total", "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("gate_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_denied(reason: &'static str) {
    counter!("gate_denied_total", "reason" => reason).increment(1);
}

pub fn record_size_rewritten() {
    counter!("gate_size_rewritten_total").increment(1);
}

pub fn record_tracked_addresses(count: usize) {
    gauge!("gate_rate_limit_tracked_addresses").set(count as f64);
}
