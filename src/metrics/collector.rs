//! Request counters and their Prometheus registry.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Owns the admission-layer counters.
///
/// Constructed once at process start and shared by handle; the request
/// path only ever increments, while the exposition endpoint reads.
#[derive(Clone)]
pub struct MetricsCollector {
    /// Total number of requests across all paths
    pub total_request_count: IntCounter,
    /// Request count partitioned by path
    pub request_count: IntCounterVec,
    /// Response status codes partitioned by path
    pub response_status: IntCounterVec,
    registry: Registry,
}

impl MetricsCollector {
    /// Create a collector with all counters registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let total_request_count = IntCounter::with_opts(Opts::new(
            "total_request_count",
            "The total number of requests across all paths",
        ))?;

        let request_count = IntCounterVec::new(
            Opts::new("request_count", "The request count partitioned by path"),
            &["path"],
        )?;

        let response_status = IntCounterVec::new(
            Opts::new(
                "response_status",
                "The count of HTTP response codes partitioned by path",
            ),
            &["path", "status_code"],
        )?;

        registry.register(Box::new(total_request_count.clone()))?;
        registry.register(Box::new(request_count.clone()))?;
        registry.register(Box::new(response_status.clone()))?;

        Ok(Self {
            total_request_count,
            request_count,
            response_status,
            registry,
        })
    }

    /// Count an inbound request before it is handled.
    pub fn record_request(&self, path: &str) {
        self.total_request_count.inc();
        self.request_count.with_label_values(&[path]).inc();
    }

    /// Count the response status observed for `path`.
    pub fn record_response(&self, path: &str, status_label: &str) {
        self.response_status
            .with_label_values(&[path, status_label])
            .inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}
