use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all Composer metrics
const PREFIX: &str = "composer";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Generation Metrics
    pub static ref GENERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_generations_total"), "Generation requests by outcome"),
        &["result"]
    ).expect("Failed to create generations_total metric");

    pub static ref GENERATION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_generation_duration_seconds"),
            "Time spent in the generation pipeline in seconds"
        )
        .buckets(vec![1.0, 5.0, 10.0, 20.0, 40.0, 60.0, 120.0, 300.0]),
        &["result"]
    ).expect("Failed to create generation_duration_seconds metric");

    pub static ref HISTORY_ENTRIES: Gauge = Gauge::new(
        format!("{PREFIX}_history_entries"),
        "Number of entries in the generation history"
    ).expect("Failed to create history_entries metric");

    pub static ref MODEL_AVAILABLE: Gauge = Gauge::new(
        format!("{PREFIX}_model_available"),
        "1 if the music generation model loaded at startup, 0 otherwise"
    ).expect("Failed to create model_available metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(GENERATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(GENERATION_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(HISTORY_ENTRIES.clone()));
    let _ = REGISTRY.register(Box::new(MODEL_AVAILABLE.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapse per-artifact paths so labels stay low-cardinality.
pub fn categorize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/composer" => "/composer",
        "/history" => "/history",
        "/api/history" => "/api/history",
        "/generate" => "/generate",
        p if p.starts_with("/download/") => "/download",
        p if p.starts_with("/static/") => "/static",
        _ => "other",
    }
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record the outcome of a generation request
pub fn record_generation(result: &str, duration: Duration) {
    GENERATIONS_TOTAL.with_label_values(&[result]).inc();
    GENERATION_DURATION_SECONDS
        .with_label_values(&[result])
        .observe(duration.as_secs_f64());
}

pub fn set_history_size(count: usize) {
    HISTORY_ENTRIES.set(count as f64);
}

pub fn set_model_available(available: bool) {
    MODEL_AVAILABLE.set(if available { 1.0 } else { 0.0 });
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
