// src/core/metrics.rs

//! Defines and registers Prometheus metrics for server monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle.

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Gauge, Histogram, TextEncoder, register_counter_vec, register_gauge,
    register_histogram,
};

lazy_static! {
    // --- Gauges ---
    /// The number of rank types that currently have an index.
    pub static ref RANK_TYPES: Gauge =
        register_gauge!("rankserver_rank_types", "Number of rank types held in memory.").unwrap();
    /// The number of members across all rank types.
    pub static ref RANKED_MEMBERS: Gauge =
        register_gauge!("rankserver_ranked_members", "Total number of ranked members across all rank types.").unwrap();

    // --- Counters ---
    /// Requests handled by the rank worker, labeled by method.
    pub static ref REQUESTS_TOTAL: CounterVec =
        register_counter_vec!("rankserver_requests_total", "Total number of requests handled, labeled by method.", &["method"]).unwrap();
    /// Requests rejected by validation, labeled by return code.
    pub static ref REJECTED_REQUESTS_TOTAL: CounterVec =
        register_counter_vec!("rankserver_rejected_requests_total", "Total number of requests rejected by validation, labeled by code.", &["code"]).unwrap();
    /// Persistence writes that failed, labeled by operation.
    pub static ref PERSISTENCE_FAILURES_TOTAL: CounterVec =
        register_counter_vec!("rankserver_persistence_failures_total", "Total number of failed persistence operations, labeled by operation.", &["op"]).unwrap();

    // --- Histograms ---
    /// Time the rank worker spends on one request.
    pub static ref REQUEST_LATENCY_SECONDS: Histogram =
        register_histogram!("rankserver_request_latency_seconds", "Latency of request processing on the rank worker in seconds.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}
