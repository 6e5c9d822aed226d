//! Prometheus metrics for gateway observability.
//!
//! Metrics are exposed on a dedicated listener (default `0.0.0.0:9090`).
//! Without an installed recorder every function here is a no-op, so handlers
//! and adapters call them unconditionally.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `gateway_readings_accepted_total` - Readings acknowledged after enqueue
//! - `gateway_readings_rejected_total` - Readings refused (label: reason)
//! - `gateway_relay_total` - Cloud relay attempts (label: outcome)
//!
//! ## Histograms
//! - `gateway_enqueue_duration_seconds` - Queue append latency
//!
//! ## Gauges
//! - `gateway_queue_connected` - Queue store connectivity (1/0)
//! - `gateway_store_connected` - Document store connectivity (1/0)

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const READINGS_ACCEPTED_TOTAL: &str = "gateway_readings_accepted_total";
    pub const READINGS_REJECTED_TOTAL: &str = "gateway_readings_rejected_total";
    pub const RELAY_TOTAL: &str = "gateway_relay_total";
    pub const ENQUEUE_DURATION_SECONDS: &str = "gateway_enqueue_duration_seconds";
    pub const QUEUE_CONNECTED: &str = "gateway_queue_connected";
    pub const STORE_CONNECTED: &str = "gateway_store_connected";
}

/// Install the Prometheus exporter and describe all metrics.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::READINGS_ACCEPTED_TOTAL,
        "Sensor readings acknowledged after a successful enqueue"
    );
    describe_counter!(
        names::READINGS_REJECTED_TOTAL,
        "Sensor readings refused, labelled by reason"
    );
    describe_counter!(
        names::RELAY_TOTAL,
        "Cloud relay attempts, labelled by outcome"
    );
    describe_histogram!(
        names::ENQUEUE_DURATION_SECONDS,
        "Queue append duration in seconds"
    );
    describe_gauge!(
        names::QUEUE_CONNECTED,
        "Queue store connectivity (1 = connected, 0 = disconnected)"
    );
    describe_gauge!(
        names::STORE_CONNECTED,
        "Document store connectivity (1 = connected, 0 = disconnected)"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_reading_accepted() {
    counter!(names::READINGS_ACCEPTED_TOTAL).increment(1);
}

/// Record a refused reading. `reason` is one of `validation`, `unavailable`, `queue_error`.
pub fn record_reading_rejected(reason: &'static str) {
    counter!(names::READINGS_REJECTED_TOTAL, "reason" => reason).increment(1);
}

/// Record a relay attempt. `outcome` is one of `delivered`, `failed`.
pub fn record_relay(outcome: &'static str) {
    counter!(names::RELAY_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_enqueue_duration(duration_secs: f64) {
    histogram!(names::ENQUEUE_DURATION_SECONDS).record(duration_secs);
}

pub fn set_queue_connected(connected: bool) {
    gauge!(names::QUEUE_CONNECTED).set(if connected { 1.0 } else { 0.0 });
}

pub fn set_store_connected(connected: bool) {
    gauge!(names::STORE_CONNECTED).set(if connected { 1.0 } else { 0.0 });
}
