//! Prometheus metrics for the gateway.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the Prometheus recorder and return the handle used to render it.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "looplabs_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "looplabs_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "looplabs_http_requests_in_flight";

    // Job metrics
    pub const JOBS_SUBMITTED_TOTAL: &str = "looplabs_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "looplabs_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "looplabs_jobs_failed_total";
    pub const RENDER_DURATION_SECONDS: &str = "looplabs_render_duration_seconds";
    pub const ENRICHMENTS_TOTAL: &str = "looplabs_enrichments_total";
    pub const ARCHIVE_FAILURES_TOTAL: &str = "looplabs_archive_failures_total";
    pub const DOWNLOADS_TOTAL: &str = "looplabs_downloads_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

/// Record a job whose render succeeded.
pub fn record_job_completed(has_video: bool) {
    let labels = [("video", has_video.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

pub fn record_job_failed(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_render_duration(duration_secs: f64) {
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}

/// Record an enrichment attempt ("enriched" or "fallback").
pub fn record_enrichment(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::ENRICHMENTS_TOTAL, &labels).increment(1);
}

pub fn record_archive_failure() {
    counter!(names::ARCHIVE_FAILURES_TOTAL).increment(1);
}

pub fn record_download(found: bool) {
    let labels = [("found", found.to_string())];
    counter!(names::DOWNLOADS_TOTAL, &labels).increment(1);
}

/// Collapse per-job paths into one label value.
fn sanitize_path(path: &str) -> String {
    if path.starts_with("/download/") {
        "/download/:job_id".to_string()
    } else {
        path.to_string()
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
