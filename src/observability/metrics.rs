//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ringhash_picks_total` (counter): picks by outcome (ready, queued)
//! - `ringhash_connect_requests_total` (counter): connects by trigger (pick, idle_kick)
//! - `ringhash_ring_rebuilds_total` (counter): rings built
//! - `ringhash_ring_size` (gauge): entries in the current ring
//! - `ringhash_backends` (gauge): live backends
//! - `ringhash_aggregate_state` (gauge): 0=idle, 1=connecting, 2=ready, 3=transient_failure
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no-ops until a recorder is installed
//! - Low-overhead metric updates on the pick path (one counter per pick)

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::state::ConnectivityState;

/// Install the Prometheus exporter with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Record one pick.
pub fn record_pick(outcome: &'static str) {
    metrics::counter!("ringhash_picks_total", "outcome" => outcome).increment(1);
}

/// Record one connection request sent to the transport.
pub fn record_connect_request(trigger: &'static str) {
    metrics::counter!("ringhash_connect_requests_total", "trigger" => trigger).increment(1);
}

/// Record a ring rebuild.
pub fn record_ring_rebuild(size: usize, backends: usize) {
    metrics::counter!("ringhash_ring_rebuilds_total").increment(1);
    metrics::gauge!("ringhash_ring_size").set(size as f64);
    metrics::gauge!("ringhash_backends").set(backends as f64);
}

/// Record the aggregate policy state.
pub fn record_aggregate_state(state: ConnectivityState) {
    metrics::gauge!("ringhash_aggregate_state").set(f64::from(state as u8));
}
