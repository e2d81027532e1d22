//! Handler for the /metrics exposition endpoint.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use std::sync::Arc;

use super::collector::MetricsCollector;

pub async fn metrics_handler(
    State(collector): State<Arc<MetricsCollector>>,
) -> Result<Response, StatusCode> {
    let buffer = collector
        .encode()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )
        .body(Body::from(buffer))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
