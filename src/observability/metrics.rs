//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, target
//! - `gateway_request_duration_seconds` (histogram): latency by target
//! - `gateway_upstream_duration_seconds` (histogram): upstream call time by target
//! - `gateway_active_connections` (gauge): reserved connections by host, target
//! - `gateway_mapping_lookups_total` (counter): resolver outcomes
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(
    method: &str,
    status: u16,
    target: &str,
    start: Instant,
    upstream: Option<Duration>,
) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_owned(),
        "status" => status.to_string(),
        "target" => target.to_owned()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "target" => target.to_owned())
        .record(start.elapsed().as_secs_f64());
    if let Some(upstream) = upstream {
        metrics::histogram!("gateway_upstream_duration_seconds", "target" => target.to_owned())
            .record(upstream.as_secs_f64());
    }
}

pub fn record_lookup(outcome: &'static str) {
    metrics::counter!("gateway_mapping_lookups_total", "outcome" => outcome).increment(1);
}

pub fn connection_reserved(host: &str, target: &str) {
    metrics::gauge!(
        "gateway_active_connections",
        "host" => host.to_owned(),
        "target" => target.to_owned()
    )
    .increment(1.0);
}

pub fn connection_released(host: &str, target: &str) {
    metrics::gauge!(
        "gateway_active_connections",
        "host" => host.to_owned(),
        "target" => target.to_owned()
    )
    .decrement(1.0);
}
