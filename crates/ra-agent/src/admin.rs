//! # Admin Endpoint
//!
//! `/health` and a Prometheus scrape of the agent's metrics on
//! `/metrics`. Served on its own listener, separate from the wire port.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use ra_telemetry::gather_metrics;
use tracing::error;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Router for the admin listener.
pub fn admin_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "ra-agent",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics() -> impl IntoResponse {
    match gather_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "metrics scrape failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
