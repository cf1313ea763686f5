//! Prometheus Metrics for usershard
//!
//! - Per-shard store operations (single-shard path)
//! - Fan-out latency and failures (all-shard path)
//! - Records held by each shard
//! - HTTP requests

use crate::sharding::ShardId;
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder, register_histogram_vec,
    register_int_counter_vec, register_int_gauge_vec,
};

lazy_static! {
    // ============================================================================
    // Shard Metrics
    // ============================================================================

    /// Total shard operations by shard, type and outcome
    pub static ref SHARD_OPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "usershard_shard_operations_total",
        "Total number of operations executed against a shard",
        &["shard", "operation", "status"]
    ).unwrap();

    /// Shard operation latency in seconds
    pub static ref SHARD_OP_DURATION: HistogramVec = register_histogram_vec!(
        "usershard_shard_operation_duration_seconds",
        "Shard operation latency in seconds",
        &["operation"],
        vec![0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0]
    ).unwrap();

    /// Users currently stored per shard
    pub static ref SHARD_RECORDS: IntGaugeVec = register_int_gauge_vec!(
        "usershard_shard_records",
        "Number of user records held by each shard",
        &["shard"]
    ).unwrap();

    // ============================================================================
    // Fan-out Metrics
    // ============================================================================

    /// All-shard operation latency (from dispatch to join)
    pub static ref FANOUT_DURATION: HistogramVec = register_histogram_vec!(
        "usershard_fanout_duration_seconds",
        "All-shard operation latency in seconds",
        &["operation", "status"],
        vec![0.0001, 0.001, 0.01, 0.1, 1.0, 10.0]
    ).unwrap();

    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// Total HTTP requests
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "usershard_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    ).unwrap();

    /// HTTP request duration
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "usershard_http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "path"],
        vec![0.0001, 0.001, 0.01, 0.1, 1.0, 10.0]
    ).unwrap();
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Status label for an operation outcome
pub fn status_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}

/// Record a single-shard operation
pub fn record_shard_op(shard: ShardId, operation: &str, status: &str, duration_secs: f64) {
    SHARD_OPS_TOTAL
        .with_label_values(&[shard.to_string().as_str(), operation, status])
        .inc();
    SHARD_OP_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}

/// Record an all-shard operation
pub fn record_fanout(operation: &str, status: &str, duration_secs: f64) {
    FANOUT_DURATION
        .with_label_values(&[operation, status])
        .observe(duration_secs);
}

/// Update the record gauge for a shard
pub fn set_shard_records(shard: ShardId, count: usize) {
    SHARD_RECORDS
        .with_label_values(&[shard.to_string().as_str()])
        .set(count as i64);
}

/// Record HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(duration_secs);
}
