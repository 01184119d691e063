//! Metrics for exchange latency and purchase outcomes.
//!
//! Recorded through the `metrics` facade. The bot is a one-shot process and
//! installs no exporter of its own; an embedding host may install a recorder
//! before calling into the library.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Exchange request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "exchange_request_latency_ms";
/// Signing latency metric name.
pub const METRIC_SIGNING_LATENCY: &str = "signing_latency_ms";
/// Runs started counter metric name.
pub const METRIC_RUNS: &str = "dca_runs_total";
/// Order submission attempts counter metric name.
pub const METRIC_ORDER_ATTEMPTS: &str = "order_attempts_total";
/// Transient-error retries counter metric name.
pub const METRIC_ORDER_RETRIES: &str = "order_retries_total";
/// Orders placed counter metric name.
pub const METRIC_ORDERS_PLACED: &str = "orders_placed_total";
/// Orders failed counter metric name.
pub const METRIC_ORDERS_FAILED: &str = "orders_failed_total";
/// Notification failures counter metric name.
pub const METRIC_NOTIFY_FAILURES: &str = "notification_failures_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "Kraken REST request latency in milliseconds"
    );
    describe_histogram!(
        METRIC_SIGNING_LATENCY,
        "Request signing latency in milliseconds"
    );

    describe_counter!(METRIC_RUNS, "Total number of purchase runs started");
    describe_counter!(
        METRIC_ORDER_ATTEMPTS,
        "Total number of order submission attempts"
    );
    describe_counter!(
        METRIC_ORDER_RETRIES,
        "Total number of retries after transient exchange errors"
    );
    describe_counter!(METRIC_ORDERS_PLACED, "Total number of orders accepted");
    describe_counter!(METRIC_ORDERS_FAILED, "Total number of purchases that failed");
    describe_counter!(
        METRIC_NOTIFY_FAILURES,
        "Total number of notifications that could not be delivered"
    );

    debug!("Metrics initialized");
}

/// Record exchange request latency.
pub fn record_http_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
}

/// Record signing operation latency.
pub fn record_signing_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_SIGNING_LATENCY).record(latency_ms);
}

/// Increment runs counter.
pub fn inc_runs() {
    counter!(METRIC_RUNS).increment(1);
}

/// Increment order attempts counter.
pub fn inc_order_attempts() {
    counter!(METRIC_ORDER_ATTEMPTS).increment(1);
}

/// Increment order retries counter.
pub fn inc_order_retries() {
    counter!(METRIC_ORDER_RETRIES).increment(1);
}

/// Increment orders placed counter.
pub fn inc_orders_placed() {
    counter!(METRIC_ORDERS_PLACED).increment(1);
}

/// Increment orders failed counter.
pub fn inc_orders_failed() {
    counter!(METRIC_ORDERS_FAILED).increment(1);
}

/// Increment notification failures counter.
pub fn inc_notify_failures() {
    counter!(METRIC_NOTIFY_FAILURES).increment(1);
}
