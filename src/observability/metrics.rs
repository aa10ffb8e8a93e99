//! Metrics collection and exposition.
//!
//! # Metrics
//! - `advisor_queries_total` (counter): answered queries by source
//! - `advisor_cache_lookups_total` (counter): cache lookups by tier and outcome
//! - `advisor_backend_requests_total` (counter): backend calls by operation and outcome
//! - `advisor_backend_request_duration_seconds` (histogram): backend latency
//! - `advisor_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `advisor_model_ready` (gauge): 1=ready, 0=not ready
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_query(source: &'static str) {
    counter!("advisor_queries_total", "source" => source).increment(1);
}

pub fn record_cache_lookup(tier: &'static str, hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!("advisor_cache_lookups_total", "tier" => tier, "outcome" => outcome).increment(1);
}

pub fn record_backend_request(operation: &'static str, outcome: &'static str, start: Instant) {
    counter!("advisor_backend_requests_total", "operation" => operation, "outcome" => outcome).increment(1);
    histogram!("advisor_backend_request_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_circuit_state(operation: &'static str, state: CircuitState) {
    gauge!("advisor_circuit_state", "operation" => operation).set(state.as_gauge());
}

pub fn record_model_ready(model: &str, ready: bool) {
    gauge!("advisor_model_ready", "model" => model.to_string()).set(if ready { 1.0 } else { 0.0 });
}
