/// Prometheus metrics for the prediction service.
///
/// Covers HTTP traffic, inference latency, prediction outcomes and artifact
/// readiness. All metrics live in a single process-wide registry which is
/// exported as text by `GET /metrics`.
///
/// # Example
/// ```no_run
/// use outbreak_prediction_api::metrics::PREDICTIONS_TOTAL;
///
/// PREDICTIONS_TOTAL.with_label_values(&["success"]).inc();
/// ```

mod middleware;

pub use middleware::{MetricsLayer, MetricsMiddleware, MetricsService};

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
};

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
            .namespace("outbreak_prediction"),
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
        .namespace("outbreak_prediction")
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    // ============================================================================
    // Inference Metrics
    // ============================================================================

    /// Prediction requests by outcome
    ///
    /// Labels: outcome (success, not_ready, validation_error, transform_error,
    /// prediction_error, internal_error, timeout)
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("predictions_total", "Total number of prediction requests by outcome")
            .namespace("outbreak_prediction"),
        &["outcome"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Time spent in scale + predict, including blocking-pool scheduling
    pub static ref INFERENCE_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "inference_duration_seconds",
            "Inference pipeline duration in seconds"
        )
        .namespace("outbreak_prediction")
        .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0])
    ).expect("Failed to create INFERENCE_DURATION_SECONDS metric");

    /// 1 when the artifact is loaded, 0 otherwise
    ///
    /// Labels: artifact (model, scaler)
    pub static ref ARTIFACT_LOADED: GaugeVec = GaugeVec::new(
        Opts::new("artifact_loaded", "Whether the artifact is loaded")
            .namespace("outbreak_prediction"),
        &["artifact"]
    ).expect("Failed to create ARTIFACT_LOADED metric");
}

/// Register all metrics with the global registry.
///
/// Call once at startup; a second call fails with `AlreadyReg`.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(PREDICTIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(INFERENCE_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(ARTIFACT_LOADED.clone()))?;

    Ok(())
}

/// Export all registered metrics in Prometheus text format
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
