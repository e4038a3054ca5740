//! Prometheus metrics for the cloud storage service
//!
//! Defines metrics for:
//! - Request counts by method and status
//! - Request latency
//! - Storage operation counts by operation and outcome
//! - Storage operation duration

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::time::Instant;

use crate::errors::StorageError;

const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

lazy_static! {
    /// Registry for all metrics
    pub static ref REGISTRY: Registry = Registry::new();

    /// HTTP request counter by method and status
    pub static ref HTTP_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("storage_service_http_requests_total", "Total HTTP requests"),
        &["method", "status"]
    )
    .expect("Failed to create HTTP_REQUESTS metric");

    /// HTTP request latency histogram
    pub static ref HTTP_REQUEST_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "storage_service_http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .buckets(LATENCY_BUCKETS.to_vec())
    )
    .expect("Failed to create HTTP_REQUEST_DURATION metric");

    /// Storage operation counter by operation and outcome
    pub static ref STORAGE_OPERATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("storage_service_storage_operations_total", "Total storage operations"),
        &["operation", "outcome"]
    )
    .expect("Failed to create STORAGE_OPERATIONS metric");

    /// Storage operation duration histogram by operation
    pub static ref STORAGE_OPERATION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "storage_service_storage_operation_duration_seconds",
            "Storage operation duration in seconds"
        )
        .buckets(LATENCY_BUCKETS.to_vec()),
        &["operation"]
    )
    .expect("Failed to create STORAGE_OPERATION_DURATION metric");
}

/// Register every metric with the global registry
pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(HTTP_REQUESTS.clone()))?;
    REGISTRY.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(STORAGE_OPERATIONS.clone()))?;
    REGISTRY.register(Box::new(STORAGE_OPERATION_DURATION.clone()))?;
    Ok(())
}

fn outcome<T>(result: &Result<T, StorageError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) if e.is_not_found() => "not_found",
        Err(StorageError::Timeout { .. }) => "timeout",
        Err(_) => "error",
    }
}

/// Record the outcome and latency of one storage call
pub fn record_storage_operation<T>(operation: &'static str, started: Instant, result: &Result<T, StorageError>) {
    STORAGE_OPERATIONS
        .with_label_values(&[operation, outcome(result)])
        .inc();
    STORAGE_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(started.elapsed().as_secs_f64());
}

/// Middleware counting every HTTP request by method and response status
pub async fn track_http_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    HTTP_REQUESTS
        .with_label_values(&[method.as_str(), response.status().as_str()])
        .inc();
    HTTP_REQUEST_DURATION.observe(started.elapsed().as_secs_f64());
    response
}
