//! Metrics collection and exposition.
//!
//! # Metrics
//! - `xapi_requests_total` (counter): dispatched requests by verb, status
//! - `xapi_request_duration_seconds` (histogram): dispatch latency by verb
//! - `xapi_failures_total` (counter): classified failures by kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter, serving scrapes on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_dispatch(verb: &'static str, status: u16, started: Instant) {
    metrics::counter!(
        "xapi_requests_total",
        "verb" => verb,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("xapi_request_duration_seconds", "verb" => verb)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_failure(kind: &'static str) {
    metrics::counter!("xapi_failures_total", "kind" => kind).increment(1);
}
