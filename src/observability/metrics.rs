//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, log pipeline health)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, rule
//! - `gateway_request_duration_seconds` (histogram): time to response headers
//! - `gateway_log_records_flushed_total` (counter): records written to the log file
//! - `gateway_log_flush_errors_total` (counter): records lost to serialize/write faults
//! - `gateway_config_reloads_total` (counter): snapshots adopted
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels for method, status code and rule name

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, rule: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "rule" => rule.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "rule" => rule.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_log_flush(written: usize, failed: usize) {
    counter!("gateway_log_records_flushed_total").increment(written as u64);
    if failed > 0 {
        counter!("gateway_log_flush_errors_total").increment(failed as u64);
    }
}

pub fn record_config_reload() {
    counter!("gateway_config_reloads_total").increment(1);
}
