//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tracker_external_calls_total` (counter): tracked calls by method, success
//! - `tracker_external_call_duration_seconds` (histogram): call latency
//! - `tracker_flushed_records_total` (counter): records handed to the sink
//! - `tracker_telemetry_errors_total` (counter): swallowed errors by kind
//! - `tracker_buckets_evicted_total` (counter): buckets removed by the sweeper
//! - `tracker_active_buckets` (gauge): live buckets after the last sweep
//!
//! Without an installed recorder every call here is a no-op.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics endpoint listening");
    Ok(())
}

pub fn record_external_call(method: &str, success: bool, duration_ms: u64) {
    metrics::counter!(
        "tracker_external_calls_total",
        "method" => method.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
    metrics::histogram!("tracker_external_call_duration_seconds")
        .record(duration_ms as f64 / 1000.0);
}

pub fn record_flushed(records: usize) {
    metrics::counter!("tracker_flushed_records_total").increment(records as u64);
}

pub fn record_telemetry_error(kind: &'static str) {
    metrics::counter!("tracker_telemetry_errors_total", "kind" => kind).increment(1);
}

pub fn record_evictions(evicted: usize) {
    if evicted > 0 {
        metrics::counter!("tracker_buckets_evicted_total").increment(evicted as u64);
    }
}

pub fn record_active_buckets(count: usize) {
    metrics::gauge!("tracker_active_buckets").set(count as f64);
}
