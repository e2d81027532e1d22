//! Token bucket implementation.

use parking_lot::Mutex;
use std::time::Instant;

/// A continuous-refill token bucket holding admission capacity for one key.
///
/// The token level is real-valued so sub-second refill accumulates
/// fractionally. A bucket starts full, refills at `refill_rate` tokens per
/// second clamped at `capacity`, and each admission consumes exactly one
/// token. Capacity and refill rate are fixed at creation.
pub struct TokenBucket {
    /// Maximum tokens the bucket can hold
    capacity: f64,
    /// Tokens added per elapsed second
    refill_rate: f64,
    /// Current level and refill timestamp, guarded together
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a new, full bucket.
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Check whether one request may proceed now, consuming a token if so.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    /// Refill for the time elapsed up to `now`, then try to take one token.
    ///
    /// The refill-and-take sequence runs as a single critical section under
    /// the bucket lock, so concurrent callers for the same key are strictly
    /// ordered by lock acquisition.
    fn allow_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock();

        // Fill the bucket
        let elapsed = now.saturating_duration_since(state.last_refill);
        let refilled = state.tokens + elapsed.as_secs_f64() * self.refill_rate;
        state.tokens = refilled.min(self.capacity);
        state.last_refill = now;

        // Evaluate the condition
        if state.tokens >= 1.0 {
            state.tokens = (state.tokens - 1.0).max(0.0);
            return true;
        }

        false
    }

    /// Current token level, without refilling.
    pub fn tokens(&self) -> f64 {
        self.state.lock().tokens
    }

    /// Maximum tokens this bucket can hold.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }
}
