//! Token-bucket rate limiter over a rolling minute window.
//!
//! Two buckets share one lock: a request bucket sized `requests_per_minute`
//! and an optional token bucket sized `tokens_per_minute` (the content API
//! bills both). Exhausted callers sleep in small increments until capacity
//! regenerates; they only fail when the wait exceeds the absolute ceiling.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::trace;

use crate::{Error, Result};

/// How long a blocked `acquire` sleeps between capacity checks.
const POLL_INCREMENT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub requests_per_minute: u32,
    /// Token budget per minute; `None` for APIs billed per request only.
    pub tokens_per_minute: Option<u32>,
    pub enabled: bool,
    /// Absolute ceiling on how long `acquire` may block before surfacing a
    /// timeout.
    pub max_wait: Duration,
}

impl RateLimiterConfig {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            tokens_per_minute: None,
            enabled: true,
            max_wait: Duration::from_secs(120),
        }
    }

    pub fn with_tokens_per_minute(mut self, tpm: u32) -> Self {
        self.tokens_per_minute = Some(tpm);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

#[derive(Debug)]
struct Bucket {
    level: f64,
    capacity: f64,
    refill_per_sec: f64,
}

impl Bucket {
    fn new(per_minute: u32) -> Self {
        let capacity = per_minute as f64;
        Self {
            level: capacity,
            capacity,
            refill_per_sec: capacity / 60.0,
        }
    }

    fn refill(&mut self, elapsed: f64) {
        self.level = (self.level + elapsed * self.refill_per_sec).min(self.capacity);
    }

    fn has(&self, cost: f64) -> bool {
        self.level >= cost
    }

    fn take(&mut self, cost: f64) {
        self.level -= cost;
    }

    /// Seconds until `cost` units are available at the current refill rate.
    fn wait_secs(&self, cost: f64) -> f64 {
        if self.has(cost) || self.refill_per_sec <= 0.0 {
            return 0.0;
        }
        (cost - self.level) / self.refill_per_sec
    }
}

#[derive(Debug)]
struct State {
    requests: Bucket,
    tokens: Option<Bucket>,
    last: Instant,
}

impl State {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64();
        if elapsed > 0.0 {
            self.requests.refill(elapsed);
            if let Some(t) = self.tokens.as_mut() {
                t.refill(elapsed);
            }
            self.last = now;
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub requests_per_minute: u32,
    pub requests_available: f64,
    pub tokens_available: Option<f64>,
    /// Estimated wait until one request is admitted, if currently exhausted.
    pub estimated_wait_ms: Option<u64>,
}

/// Rolling-minute rate limiter shared across concurrent callers.
///
/// Disabled limiters admit everything immediately; the system never drops a
/// request due to rate limiting alone.
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        let state = Mutex::new(State {
            requests: Bucket::new(cfg.requests_per_minute),
            tokens: cfg.tokens_per_minute.map(Bucket::new),
            last: Instant::now(),
        });
        Self { cfg, state }
    }

    /// Non-blocking check: admit one request costing `token_cost` tokens.
    ///
    /// A cost above the token bucket's capacity is clamped to it: the bucket
    /// can never hold more, so an oversized request drains a full window
    /// rather than waiting for capacity that cannot exist.
    pub async fn try_acquire(&self, token_cost: u32) -> bool {
        if !self.cfg.enabled {
            return true;
        }
        let mut st = self.state.lock().await;
        st.refill();
        let cost = match st.tokens.as_ref() {
            Some(t) => (token_cost as f64).min(t.capacity),
            None => 0.0,
        };
        let token_ok = st.tokens.as_ref().map(|t| t.has(cost)).unwrap_or(true);
        if st.requests.has(1.0) && token_ok {
            st.requests.take(1.0);
            if let Some(t) = st.tokens.as_mut() {
                t.take(cost);
            }
            true
        } else {
            false
        }
    }

    /// Block until one request costing `token_cost` tokens is admitted.
    ///
    /// Sleeps in small increments; surfaces a timeout only past the
    /// configured `max_wait` ceiling.
    pub async fn acquire(&self, token_cost: u32) -> Result<()> {
        if !self.cfg.enabled {
            return Ok(());
        }
        let start = Instant::now();
        loop {
            if self.try_acquire(token_cost).await {
                return Ok(());
            }
            if start.elapsed() >= self.cfg.max_wait {
                return Err(Error::timeout("rate limiter wait", start.elapsed()));
            }
            trace!(
                token_cost,
                waited_ms = start.elapsed().as_millis() as u64,
                "rate limit exhausted, waiting"
            );
            tokio::time::sleep(POLL_INCREMENT).await;
        }
    }

    pub async fn snapshot(&self) -> RateLimiterSnapshot {
        let mut st = self.state.lock().await;
        st.refill();
        let mut wait = st.requests.wait_secs(1.0);
        if let Some(t) = st.tokens.as_ref() {
            // Report the longer of the two waits for a cost-1 request.
            wait = wait.max(t.wait_secs(1.0));
        }
        RateLimiterSnapshot {
            requests_per_minute: self.cfg.requests_per_minute,
            requests_available: st.requests.level,
            tokens_available: st.tokens.as_ref().map(|t| t.level),
            estimated_wait_ms: if wait > 0.0 {
                Some((wait * 1000.0) as u64)
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_burst_up_to_rpm_admitted_immediately() {
        let limiter = RateLimiter::new(RateLimiterConfig::per_minute(5));
        for _ in 0..5 {
            assert!(limiter.try_acquire(0).await);
        }
        assert!(!limiter.try_acquire(0).await);
    }

    #[tokio::test]
    async fn test_excess_request_blocks_until_window_admits_it() {
        // 600 rpm = 10 per second, so a drained bucket admits the next
        // request after ~100ms.
        let limiter = RateLimiter::new(RateLimiterConfig::per_minute(600));
        while limiter.try_acquire(0).await {}

        let start = Instant::now();
        limiter.acquire(0).await.unwrap();
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(40), "waited {:?}", waited);
        assert!(waited < Duration::from_secs(2), "waited {:?}", waited);
    }

    #[tokio::test]
    async fn test_token_budget_enforced_independently() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::per_minute(100).with_tokens_per_minute(1000),
        );
        // Plenty of request budget, but the token bucket drains first.
        assert!(limiter.try_acquire(900).await);
        assert!(!limiter.try_acquire(900).await);
        // A cheap request still fits.
        assert!(limiter.try_acquire(50).await);
    }

    #[tokio::test]
    async fn test_cost_above_token_capacity_drains_a_full_window() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::per_minute(100)
                .with_tokens_per_minute(1_000)
                .with_max_wait(Duration::from_millis(300)),
        );
        // The bucket can never hold 2000 tokens; the request must still be
        // admitted from a fresh limiter rather than waiting until max_wait.
        let start = Instant::now();
        limiter.acquire(2_000).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(100));
        // It paid the whole window: the bucket is now empty.
        assert!(!limiter.try_acquire(1_000).await);
    }

    #[tokio::test]
    async fn test_disabled_limiter_always_admits() {
        let limiter =
            RateLimiter::new(RateLimiterConfig::per_minute(1).with_enabled(false));
        for _ in 0..100 {
            assert!(limiter.try_acquire(10_000).await);
        }
        tokio_test::assert_ok!(limiter.acquire(10_000).await);
    }

    #[tokio::test]
    async fn test_wait_ceiling_surfaces_timeout() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::per_minute(1).with_max_wait(Duration::from_millis(80)),
        );
        assert!(limiter.try_acquire(0).await);
        // 1 rpm refills far too slowly for the 80ms ceiling.
        let err = limiter.acquire(0).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_snapshot_reports_exhaustion() {
        let limiter = RateLimiter::new(RateLimiterConfig::per_minute(2));
        assert!(limiter.snapshot().await.estimated_wait_ms.is_none());
        assert!(limiter.try_acquire(0).await);
        assert!(limiter.try_acquire(0).await);
        let snap = limiter.snapshot().await;
        assert!(snap.estimated_wait_ms.is_some());
        assert!(snap.requests_available < 1.0);
    }

    #[tokio::test]
    async fn test_concurrent_acquires_never_overdraw() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::per_minute(10)));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let l = limiter.clone();
            handles.push(tokio::spawn(async move { l.try_acquire(0).await }));
        }
        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() {
                admitted += 1;
            }
        }
        assert!(admitted <= 10, "admitted {}", admitted);
    }
}
