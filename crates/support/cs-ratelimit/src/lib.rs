//! cs-ratelimit - Token bucket admission control for cloud-sweep.
//!
//! Every outbound storage API call (list page or batch delete) acquires one
//! token before it is issued. Tokens refill continuously at the configured
//! rate up to the burst capacity, so sustained throughput never exceeds the
//! rate while short bursts are allowed.
//!
//! # Example
//!
//! ```
//! use cs_ratelimit::RateLimiter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // 100 calls per second, bursts of up to 10
//! let limiter = RateLimiter::with_burst(100, 10);
//!
//! limiter.acquire().await;
//! assert!(limiter.try_acquire());
//! # }
//! ```

// Token counts are tracked as f64 for fractional refill. Rates and bursts are
// small integers, so the u32 -> f64 conversions are exact.
#![allow(clippy::cast_precision_loss)]

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::trace;

/// Token bucket rate limiter.
///
/// Waiters queue on a fair (FIFO) async mutex, so every caller eventually
/// acquires a token regardless of contention. The mutex is held while a
/// waiter sleeps for its token; nobody else can consume the token it is
/// waiting for.
#[derive(Debug)]
pub struct RateLimiter {
    /// Tokens added per second
    rate: f64,
    /// Maximum tokens that can accumulate
    capacity: f64,
    /// Bucket state, only reachable through acquire/try_acquire
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter whose burst capacity equals its rate.
    ///
    /// # Arguments
    ///
    /// * `rate_per_second` - Calls admitted per second (clamped to at least 1)
    pub fn new(rate_per_second: u32) -> Self {
        Self::with_burst(rate_per_second, rate_per_second)
    }

    /// Create a limiter with an explicit burst capacity.
    ///
    /// The bucket starts full. Both arguments are clamped to at least 1.
    pub fn with_burst(rate_per_second: u32, burst: u32) -> Self {
        let rate = f64::from(rate_per_second.max(1));
        let capacity = f64::from(burst.max(1));

        Self {
            rate,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Tokens added per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Maximum burst size.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Wait until a token is available, then consume it.
    ///
    /// Never fails: the limiter throttles, it does not reject.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        self.refill(&mut state);

        if state.tokens < 1.0 {
            let wait = Duration::from_secs_f64((1.0 - state.tokens) / self.rate);
            trace!(wait_ms = wait.as_millis() as u64, "Waiting for rate limit token");
            sleep(wait).await;
            self.refill(&mut state);
        }

        // Timer rounding can leave the bucket a hair short of a full token;
        // the deficit is carried into the next refill.
        state.tokens -= 1.0;
    }

    /// Consume a token only if one is available right now.
    ///
    /// Returns `false` without waiting when the bucket is empty or another
    /// caller is currently waiting for a token.
    pub fn try_acquire(&self) -> bool {
        let Ok(mut state) = self.state.try_lock() else {
            return false;
        };
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;
    }
}
