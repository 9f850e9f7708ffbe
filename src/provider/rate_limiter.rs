//! Token bucket shared by every caller of one backend.
//!
//! Tokens accrue at `rate` per second up to `capacity`; each call takes one
//! and waits while the bucket is empty.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::time::sleep;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// `requests_per_second == 0` disables limiting.
    pub fn new(requests_per_second: u32) -> Self {
        let rate = f64::from(requests_per_second);
        RateLimiter {
            rate,
            capacity: rate.max(1.0),
            state: Mutex::new(BucketState {
                tokens: rate.max(1.0),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Waits for a token. Dropping the future gives up the wait.
    pub async fn wait(&self) {
        if self.rate <= 0.0 {
            return;
        }

        loop {
            match self.try_acquire() {
                None => return,
                Some(delay) => sleep(delay).await,
            }
        }
    }

    /// Takes a token, or returns how long until one is available.
    fn try_acquire(&self) -> Option<Duration> {
        let mut state =
            self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return None;
        }

        Some(Duration::from_secs_f64((1.0 - state.tokens) / self.rate))
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").field("rate", &self.rate).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_up_to_capacity() {
        let limiter = RateLimiter::new(5);
        let started = Instant::now();
        for _ in 0..5 {
            limiter.wait().await;
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn waits_when_empty() {
        let limiter = RateLimiter::new(10);
        for _ in 0..10 {
            limiter.wait().await;
        }
        let started = Instant::now();
        limiter.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn zero_rate_is_unlimited() {
        let limiter = RateLimiter::new(0);
        for _ in 0..1000 {
            limiter.wait().await;
        }
    }
}
