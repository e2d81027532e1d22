//! Rate limiting logic and state management.

mod bucket;
mod key;
mod layer;

pub use bucket::TokenBucket;
pub use key::KeyStrategy;
pub use layer::{BucketRegistry, RateLimitLayer, RateLimitService};
