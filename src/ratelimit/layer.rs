//! Tower middleware enforcing per-key admission.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::bucket::TokenBucket;
use super::key::KeyStrategy;
use crate::config::RateLimitConfig;

/// Registry of per-key token buckets.
///
/// The registry lock only guards lookup-or-insert; admission itself runs
/// under the individual bucket's lock, so distinct keys never serialize
/// each other's checks. Buckets are never evicted and live for the process
/// lifetime, one per distinct key ever seen.
pub struct BucketRegistry {
    strategy: KeyStrategy,
    capacity: f64,
    refill_rate: f64,
    buckets: RwLock<HashMap<String, Arc<TokenBucket>>>,
}

impl BucketRegistry {
    /// Create an empty registry with the configured strategy and limits.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            strategy: config.strategy,
            capacity: config.capacity,
            refill_rate: config.refill_rate,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Derive the partition key for `req` using the configured strategy.
    pub fn key_for(&self, req: &Request) -> crate::error::Result<String> {
        self.strategy.extract(req)
    }

    /// Fetch the bucket for `key`, creating it full on first sight.
    ///
    /// Two callers racing on a fresh key may both take the write lock, but
    /// the map entry guarantees a single bucket instance per key.
    pub fn bucket(&self, key: &str) -> Arc<TokenBucket> {
        if let Some(bucket) = self.buckets.read().get(key) {
            return bucket.clone();
        }

        let mut buckets = self.buckets.write();
        buckets
            .entry(key.to_string())
            .or_insert_with(|| {
                debug!(
                    key = %key,
                    capacity = self.capacity,
                    refill_rate = self.refill_rate,
                    "Creating new token bucket"
                );
                Arc::new(TokenBucket::new(self.capacity, self.refill_rate))
            })
            .clone()
    }

    /// Number of distinct keys seen so far.
    pub fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }
}

/// Tower layer for per-key rate limiting.
#[derive(Clone)]
pub struct RateLimitLayer {
    registry: Arc<BucketRegistry>,
}

impl RateLimitLayer {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            registry: Arc::new(BucketRegistry::new(config)),
        }
    }

    /// Shared handle to the underlying registry.
    pub fn registry(&self) -> Arc<BucketRegistry> {
        self.registry.clone()
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            registry: self.registry.clone(),
        }
    }
}

/// Tower service for per-key rate limiting.
///
/// Rejected requests are answered directly and never reach the inner
/// service.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    registry: Arc<BucketRegistry>,
}

impl<S> Service<Request> for RateLimitService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
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
        let key = match self.registry.key_for(&req) {
            Ok(key) => key,
            Err(error) => {
                warn!(error = %error, "Failed to derive a rate-limit key");
                let response = (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unable to parse the source of the request",
                )
                    .into_response();
                return Box::pin(async move { Ok(response) });
            }
        };

        let bucket = self.registry.bucket(&key);
        if !bucket.allow() {
            debug!(key = %key, "Rate limit exceeded");
            let response =
                (StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response();
            return Box::pin(async move { Ok(response) });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn test_config(capacity: f64) -> RateLimitConfig {
        RateLimitConfig {
            strategy: KeyStrategy::OriginAddress,
            capacity,
            // Negligible refill so test duration cannot mint tokens
            refill_rate: 0.0001,
        }
    }

    fn request_from(addr: &str) -> Request {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo::<SocketAddr>(addr.parse().unwrap()));
        req
    }

    fn ok_service() -> impl Service<Request, Response = Response, Error = Infallible, Future: Send + 'static>
           + Clone
           + Send
           + 'static {
        tower::service_fn(|_req: Request| async {
            Ok::<_, Infallible>((StatusCode::OK, "Hello, World!").into_response())
        })
    }

    #[test]
    fn test_registry_creates_one_bucket_per_key() {
        let registry = Arc::new(BucketRegistry::new(&test_config(10.0)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.bucket("10.0.0.1"))
            })
            .collect();

        let buckets: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.bucket_count(), 1);
        for bucket in &buckets[1..] {
            assert!(Arc::ptr_eq(&buckets[0], bucket));
        }
    }

    #[test]
    fn test_registry_partitions_by_key() {
        let registry = BucketRegistry::new(&test_config(10.0));

        let a = registry.bucket("10.0.0.1");
        let b = registry.bucket("10.0.0.2");

        assert_eq!(registry.bucket_count(), 2);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_exhausted_bucket_yields_429() {
        let layer = RateLimitLayer::new(&test_config(2.0));
        let service = layer.layer(ok_service());

        for _ in 0..2 {
            let response = service
                .clone()
                .oneshot(request_from("203.0.113.5:54321"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = service
            .clone()
            .oneshot(request_from("203.0.113.5:54321"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_distinct_origins_do_not_share_buckets() {
        let layer = RateLimitLayer::new(&test_config(1.0));
        let service = layer.layer(ok_service());

        let first = service
            .clone()
            .oneshot(request_from("203.0.113.5:1000"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        // Same origin, different port: same key, now exhausted
        let second = service
            .clone()
            .oneshot(request_from("203.0.113.5:2000"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        // Different origin gets its own bucket
        let other = service
            .clone()
            .oneshot(request_from("203.0.113.6:1000"))
            .await
            .unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unparseable_origin_yields_500_without_bucket() {
        let layer = RateLimitLayer::new(&test_config(10.0));
        let registry = layer.registry();
        let service = layer.layer(ok_service());

        // No ConnectInfo extension on the request
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = service.clone().oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(registry.bucket_count(), 0);
    }
}
