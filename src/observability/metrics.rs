//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relay calls by method, outcome
//! - `relay_upstream_duration_seconds` (histogram): target round-trip time
//! - `relay_validation_rejections_total` (counter): rejected descriptions
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Verbs kept as their own label value; anything else is `OTHER`.
const KNOWN_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

/// Record one relay call.
pub fn record_relay(method: &str, outcome: &'static str, upstream: Option<Duration>) {
    let method = method_label(method);
    metrics::counter!("relay_requests_total", "method" => method, "outcome" => outcome)
        .increment(1);
    if let Some(elapsed) = upstream {
        metrics::histogram!("relay_upstream_duration_seconds", "method" => method)
            .record(elapsed.as_secs_f64());
    }
}

pub fn record_validation_rejection() {
    metrics::counter!("relay_validation_rejections_total").increment(1);
}

fn method_label(method: &str) -> &'static str {
    KNOWN_METHODS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(method))
        .copied()
        .unwrap_or("OTHER")
}
