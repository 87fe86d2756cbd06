//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Gateway Metrics
    pub static ref GATEWAY_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("promptscroll_gateway_requests_total", "Total number of remote gateway requests"),
        &["operation", "status"]
    ).expect("metric can be created");
    pub static ref GATEWAY_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "promptscroll_gateway_request_duration_seconds",
            "Remote gateway request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"]
    ).expect("metric can be created");

    // Pagination Metrics
    pub static ref PAGE_FETCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("promptscroll_page_fetches_total", "Total number of page fetches"),
        &["kind", "outcome"]
    ).expect("metric can be created");
    pub static ref STALE_PAGES_DISCARDED_TOTAL: IntCounter = IntCounter::new(
        "promptscroll_stale_pages_discarded_total",
        "Page responses dropped because a newer refresh superseded them"
    ).expect("metric can be created");

    // Action Metrics
    pub static ref ACTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("promptscroll_actions_total", "Total number of prompt actions"),
        &["action", "outcome"]
    ).expect("metric can be created");

    // Local Storage Metrics
    pub static ref STORAGE_FALLBACKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("promptscroll_storage_fallbacks_total", "Local blobs that were unreadable and replaced by defaults"),
        &["key"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("promptscroll_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(GATEWAY_REQUESTS_TOTAL.clone()))
        .expect("GATEWAY_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(GATEWAY_REQUEST_DURATION_SECONDS.clone()))
        .expect("GATEWAY_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(PAGE_FETCHES_TOTAL.clone()))
        .expect("PAGE_FETCHES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(STALE_PAGES_DISCARDED_TOTAL.clone()))
        .expect("STALE_PAGES_DISCARDED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ACTIONS_TOTAL.clone()))
        .expect("ACTIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(STORAGE_FALLBACKS_TOTAL.clone()))
        .expect("STORAGE_FALLBACKS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Render all registered metrics in the Prometheus text format.
pub fn render() -> String {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(error) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!(%error, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
