//! Politeness pacing between requests to the source site.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Enforces a fixed quiet interval between requests.
///
/// The first acquisition is immediate. Later ones wait until `interval` has
/// passed since the previous request ended, as marked by [`RateLimiter::release`],
/// or since the previous acquisition when nothing was released.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<RateLimiterState>>,
}

struct RateLimiterState {
    last: Option<Instant>,
    interval: Duration,
}

impl RateLimiter {
    /// Create a limiter with a fixed interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(RateLimiterState {
                last: None,
                interval,
            })),
        }
    }

    /// Create from a millisecond count, as stored in config.
    pub fn from_millis(interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(interval_ms))
    }

    /// Wait for this request's slot.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        if let Some(last) = state.last {
            let ready_at = last + state.interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }

        state.last = Some(Instant::now());
    }

    /// Mark the current request as finished. The next slot opens `interval`
    /// after this call.
    pub async fn release(&self) {
        self.state.lock().await.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        let start = std::time::Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_spacing_between_acquires() {
        let limiter = RateLimiter::from_millis(50);
        let start = std::time::Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_interval_counts_from_release() {
        let limiter = RateLimiter::from_millis(100);
        limiter.acquire().await;
        // Request outlasts the interval
        tokio::time::sleep(Duration::from_millis(150)).await;
        limiter.release().await;

        let released = std::time::Instant::now();
        limiter.acquire().await;
        assert!(released.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let limiter = RateLimiter::from_millis(0);
        let start = std::time::Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
