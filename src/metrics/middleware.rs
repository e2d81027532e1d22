//! Tower middleware recording request and response counters.

use axum::extract::Request;
use axum::response::Response;
use futures::future::BoxFuture;
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::debug;

use super::capture::ResponseCapture;
use super::collector::MetricsCollector;

/// Tower layer for request metrics.
#[derive(Clone)]
pub struct MetricsLayer {
    collector: Arc<MetricsCollector>,
}

impl MetricsLayer {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            collector: self.collector.clone(),
        }
    }
}

/// Tower service for request metrics.
///
/// Counts every request before the inner service runs and records the
/// resulting status afterwards. Downstream failures pass through
/// untouched; their status is recorded as the capture default.
#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    collector: Arc<MetricsCollector>,
}

impl<S> Service<Request> for MetricsService<S>
where
    S: Service<Request, Response = Response>,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let collector = self.collector.clone();
        let path = req.uri().path().to_string();

        collector.record_request(&path);

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut capture = ResponseCapture::new();
            let result = fut.await;

            if let Ok(response) = &result {
                capture.record(response.status());
            }

            debug!(path = %path, status = capture.status_code(), "Recorded response status");
            collector.record_response(&path, &capture.status_label());

            result
        })
    }
}
