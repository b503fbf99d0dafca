//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_page_requests_total` (counter): page responses by outcome
//! - `gateway_upstream_requests_total` (counter): API calls by method, status
//! - `gateway_upstream_duration_seconds` (histogram): API call latency
//! - `gateway_bypass_total` (counter): requests handed to the API by method

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_upstream(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    ::metrics::counter!(
        "gateway_upstream_requests_total",
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("gateway_upstream_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

/// `outcome` is one of `render`, `redirect`, `not_found`, `error`.
pub fn record_page_outcome(outcome: &'static str) {
    ::metrics::counter!("gateway_page_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_bypass(method: &str) {
    ::metrics::counter!("gateway_bypass_total", "method" => method.to_string()).increment(1);
}
