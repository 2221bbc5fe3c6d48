//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by service, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency by service
//! - `gateway_breaker_transitions_total` (counter): state changes by service, from, to
//! - `gateway_command_failures_total` (counter): fallback invocations by service, reason
//!
//! # Design Decisions
//! - Facade calls are no-ops until a recorder is installed, so tests need no setup
//! - Labels are service name, never instance id (bounded cardinality)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one proxied request.
pub fn record_request(service: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "service" => service.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "service" => service.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_transition(service: &str, from: &'static str, to: &'static str) {
    metrics::counter!(
        "gateway_breaker_transitions_total",
        "service" => service.to_string(),
        "from" => from,
        "to" => to
    )
    .increment(1);
}

pub fn record_command_failure(service: &str, reason: &'static str) {
    metrics::counter!(
        "gateway_command_failures_total",
        "service" => service.to_string(),
        "reason" => reason
    )
    .increment(1);
}
