//! Prometheus Metrics HTTP Handler

use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;

/// GET /metrics - Prometheus metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    match crate::metrics::encode_metrics() {
        Ok(metrics) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            metrics,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Middleware recording request count and latency per matched route
pub async fn track_http_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    // Label by route template so emails do not become label values
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    crate::metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// Initialize metrics with default values
pub fn init_metrics() {
    // Force initialization of all metrics by accessing them
    let _ = &*crate::metrics::SHARD_OPS_TOTAL;
    let _ = &*crate::metrics::SHARD_OP_DURATION;
    let _ = &*crate::metrics::SHARD_RECORDS;
    let _ = &*crate::metrics::FANOUT_DURATION;
    let _ = &*crate::metrics::HTTP_REQUESTS_TOTAL;
    let _ = &*crate::metrics::HTTP_REQUEST_DURATION;

    tracing::info!("Prometheus metrics initialized (6 metric types registered)");
}
