//! Request metrics: counters, status capture, and exposition.

mod capture;
mod collector;
mod handler;
mod middleware;

pub use capture::ResponseCapture;
pub use collector::MetricsCollector;
pub use handler::metrics_handler;
pub use middleware::{MetricsLayer, MetricsService};
