//! Controller metrics
//!
//! Ingress build and backend-ref validation metrics, exposed through a
//! dedicated prometheus registry.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Controller metrics registry
    pub static ref CONTROLLER_METRICS_REGISTRY: Registry = Registry::new();

    /// Ingress build duration
    static ref INGRESS_BUILD_DURATION: HistogramVec = {
        let opts = HistogramOpts::new(
            "ingress_build_duration_seconds",
            "Ingress rule build duration in seconds",
        );
        let histogram = HistogramVec::new(opts, &["route_kind"])
            .expect("Failed to create histogram");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(histogram.clone()))
            .expect("Failed to register histogram");
        histogram
    };

    /// Ingress builds total
    static ref INGRESS_BUILDS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "ingress_builds_total",
            "Total number of ingress rule builds",
        );
        let counter = IntCounterVec::new(opts, &["route_kind", "result"])
            .expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };

    /// Backend reference validations total
    static ref BACKEND_REF_VALIDATIONS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "backend_ref_validations_total",
            "Total number of backend reference validations",
        );
        let counter = IntCounterVec::new(opts, &["route_kind", "outcome", "reason"])
            .expect("Failed to create counter");
        CONTROLLER_METRICS_REGISTRY
            .register(Box::new(counter.clone()))
            .expect("Failed to register counter");
        counter
    };
}

/// Record an ingress build pass for one route kind
pub fn record_ingress_build(route_kind: &str, duration_secs: f64, result: &str) {
    INGRESS_BUILD_DURATION
        .with_label_values(&[route_kind])
        .observe(duration_secs);

    INGRESS_BUILDS_TOTAL
        .with_label_values(&[route_kind, result])
        .inc();
}

/// Record the outcome of one backend reference resolution
pub fn record_backend_ref_validation(route_kind: &str, outcome: &str, reason: &str) {
    BACKEND_REF_VALIDATIONS_TOTAL
        .with_label_values(&[route_kind, outcome, reason])
        .inc();
}

/// Gather controller metrics
pub fn gather_controller_metrics() -> Result<String, String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = CONTROLLER_METRICS_REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Failed to convert to UTF-8: {}", e))
}
