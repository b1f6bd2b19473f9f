//! Metrics collection and export for the simulator.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const ACTIONS_TOTAL: &str = "chatsync_actions_total";
    pub const DISPATCH_SECONDS: &str = "chatsync_dispatch_seconds";
    pub const SNAPSHOTS_DELIVERED_TOTAL: &str = "chatsync_snapshots_delivered_total";
    pub const CONSUMERS_ACTIVE: &str = "chatsync_consumers_active";
    pub const LIFECYCLE_TRANSITIONS_TOTAL: &str = "chatsync_lifecycle_transitions_total";
    pub const ERRORS_TOTAL: &str = "chatsync_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(names::ACTIONS_TOTAL, "Total number of committed actions");
    metrics::describe_histogram!(
        names::DISPATCH_SECONDS,
        "Time spent in dispatch, including the reducer, in seconds"
    );
    metrics::describe_counter!(
        names::SNAPSHOTS_DELIVERED_TOTAL,
        "Total number of snapshots delivered to consumers"
    );
    metrics::describe_gauge!(names::CONSUMERS_ACTIVE, "Current number of attached consumers");
    metrics::describe_counter!(
        names::LIFECYCLE_TRANSITIONS_TOTAL,
        "Total number of lifecycle transitions"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a committed action.
pub fn record_action(kind: &'static str, seconds: f64) {
    counter!(names::ACTIONS_TOTAL, "kind" => kind).increment(1);
    histogram!(names::DISPATCH_SECONDS).record(seconds);
}

/// Record a snapshot delivered to a consumer.
pub fn record_delivery(consumer: &str) {
    counter!(names::SNAPSHOTS_DELIVERED_TOTAL, "consumer" => consumer.to_string()).increment(1);
}

/// Record a lifecycle transition into `phase`.
pub fn record_transition(phase: &'static str) {
    counter!(names::LIFECYCLE_TRANSITIONS_TOTAL, "phase" => phase).increment(1);
}

/// Record an error.
pub fn record_error(error_type: &str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type.to_string()).increment(1);
}

/// Metrics guard that tracks an attached consumer until dropped.
pub struct ConsumerMetricsGuard;

impl ConsumerMetricsGuard {
    /// Create a new metrics guard, recording an attached consumer.
    #[must_use]
    pub fn new() -> Self {
        gauge!(names::CONSUMERS_ACTIVE).increment(1.0);
        Self
    }
}

impl Default for ConsumerMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConsumerMetricsGuard {
    fn drop(&mut self) {
        gauge!(names::CONSUMERS_ACTIVE).decrement(1.0);
    }
}
