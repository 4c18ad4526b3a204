//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authgate_http_requests_total", "Total number of HTTP requests"),
        &["endpoint"]
    ).expect("metric can be created");

    // Authentication Metrics
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authgate_logins_total", "Total number of completed sign-in callbacks"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref LOGOUTS_TOTAL: IntCounter = IntCounter::new(
        "authgate_logouts_total",
        "Total number of logouts"
    ).expect("metric can be created");
    pub static ref AUTH_REJECTIONS_TOTAL: IntCounter = IntCounter::new(
        "authgate_auth_rejections_total",
        "Total number of requests rejected by the authorization gate"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authgate_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; later registrations are ignored.
pub fn init_metrics() {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(LOGINS_TOTAL.clone()),
        Box::new(LOGOUTS_TOTAL.clone()),
        Box::new(AUTH_REJECTIONS_TOTAL.clone()),
        Box::new(ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        if let Err(error) = REGISTRY.register(collector) {
            tracing::debug!(%error, "Metric already registered");
        }
    }

    tracing::info!("Metrics registry initialized");
}
