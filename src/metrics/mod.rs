//! Prometheus metrics for the inference server.
//!
//! Covers:
//! - HTTP request tracking (via [`MetricsMiddleware`])
//! - Prediction counts, latency and failures per model
//! - Batch sizes
//! - Artifact bundle availability
//!
//! # Example
//! ```no_run
//! use traffic_anomaly_detector::metrics::PREDICTIONS_TOTAL;
//!
//! PREDICTIONS_TOTAL.with_label_values(&["knn", "attack"]).inc();
//! ```

mod middleware;

pub use middleware::{MetricsLayer, MetricsMiddleware};

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
};

const NAMESPACE: &str = "traffic_anomaly_detector";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    /// Requests currently in flight
    pub static ref HTTP_CONNECTIONS_ACTIVE: Gauge = Gauge::with_opts(
        Opts::new("http_connections_active", "Number of in-flight HTTP requests")
            .namespace(NAMESPACE)
    ).expect("Failed to create HTTP_CONNECTIONS_ACTIVE metric");

    // ============================================================================
    // Inference Metrics
    // ============================================================================

    /// Successful predictions
    ///
    /// Labels: model, label (normal, attack)
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("predictions_total", "Total number of successful predictions")
            .namespace(NAMESPACE),
        &["model", "label"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Failed predictions
    ///
    /// Labels: model, class (user_input, internal)
    pub static ref PREDICTION_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("prediction_errors_total", "Total number of failed predictions")
            .namespace(NAMESPACE),
        &["model", "class"]
    ).expect("Failed to create PREDICTION_ERRORS_TOTAL metric");

    /// Validate + scale + predict latency
    ///
    /// Labels: model
    pub static ref PREDICTION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "prediction_duration_seconds",
            "Single prediction pipeline duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
        &["model"]
    ).expect("Failed to create PREDICTION_DURATION_SECONDS metric");

    /// Elements per batch request
    pub static ref BATCH_SIZE: Histogram = Histogram::with_opts(
        HistogramOpts::new("batch_size", "Number of elements per batch prediction request")
            .namespace(NAMESPACE)
            .buckets(vec![1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0])
    ).expect("Failed to create BATCH_SIZE metric");

    /// 1 when the artifact bundle is loaded, 0 otherwise
    pub static ref MODEL_BUNDLE_LOADED: Gauge = Gauge::with_opts(
        Opts::new("model_bundle_loaded", "Whether the model artifact bundle is loaded")
            .namespace(NAMESPACE)
    ).expect("Failed to create MODEL_BUNDLE_LOADED metric");

    // ============================================================================
    // System Metrics
    // ============================================================================

    /// Build information
    ///
    /// Labels: version
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Build information").namespace(NAMESPACE),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");
}

/// Register all metrics with the global registry. Safe to call more than once.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        Box::new(HTTP_CONNECTIONS_ACTIVE.clone()),
        Box::new(PREDICTIONS_TOTAL.clone()),
        Box::new(PREDICTION_ERRORS_TOTAL.clone()),
        Box::new(PREDICTION_DURATION_SECONDS.clone()),
        Box::new(BATCH_SIZE.clone()),
        Box::new(MODEL_BUNDLE_LOADED.clone()),
        Box::new(BUILD_INFO.clone()),
    ];

    for collector in collectors {
        match PROMETHEUS_REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }

    BUILD_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Encode the registry in Prometheus text exposition format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_metrics().unwrap();
        init_metrics().unwrap();
    }

    #[test]
    fn test_gather_contains_prediction_metrics() {
        init_metrics().unwrap();
        PREDICTIONS_TOTAL.with_label_values(&["knn", "attack"]).inc();
        PREDICTION_ERRORS_TOTAL
            .with_label_values(&["knn", "user_input"])
            .inc();

        let output = gather_metrics();
        assert!(output.contains("traffic_anomaly_detector_predictions_total"));
        assert!(output.contains("traffic_anomaly_detector_prediction_errors_total"));
        assert!(output.contains("traffic_anomaly_detector_build_info"));
    }
}
