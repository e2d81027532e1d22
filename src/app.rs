//! Router assembly.

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::metrics::{metrics_handler, MetricsCollector, MetricsLayer};
use crate::ratelimit::RateLimitLayer;

async fn hello() -> &'static str {
    "Hello, World!"
}

/// Build the application router.
///
/// The metrics middleware wraps the rate limiter, which wraps the
/// application handler, so every accepted or rejected request is counted
/// and rejections never reach the handler. The `/metrics` exposition route
/// sits outside both layers.
pub fn build_router(config: &Config, collector: Arc<MetricsCollector>) -> Router {
    let admission = ServiceBuilder::new()
        .layer(MetricsLayer::new(collector.clone()))
        .layer(RateLimitLayer::new(&config.rate_limit));

    Router::new()
        .route("/", get(hello))
        .layer(admission)
        .route("/metrics", get(metrics_handler))
        .with_state(collector)
        .layer(TraceLayer::new_for_http())
}
