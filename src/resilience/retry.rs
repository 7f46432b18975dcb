//! Exponential-backoff retry around fallible async operations.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::{Error, ErrorKind, Result};

/// Retry policy applied to one logical operation.
///
/// The policy retries only failures whose [`ErrorKind`] is in `retry_on`;
/// everything else propagates immediately with the original error intact.
/// After exhausting `max_retries` additional attempts, the **last** observed
/// error propagates.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    backoff_factor: f64,
    max_delay: Duration,
    retry_on: HashSet<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
            retry_on: HashSet::from([
                ErrorKind::RateLimited,
                ErrorKind::Timeout,
                ErrorKind::Server,
                ErrorKind::Transport,
            ]),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// `max_retries = 0` means exactly one attempt, no retry.
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_initial_delay(mut self, d: Duration) -> Self {
        self.initial_delay = d;
        self
    }

    pub fn with_backoff_factor(mut self, f: f64) -> Self {
        self.backoff_factor = f.max(1.0);
        self
    }

    /// Absolute ceiling on any single sleep, including provider hints.
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    /// Replace the set of error kinds eligible for retry.
    pub fn with_retry_on(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retry_on = kinds.into_iter().collect();
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry `attempt` (1-based): `initial * factor^(attempt-1)`,
    /// capped at `max_delay`.
    ///
    /// The cap is applied in float space: at high attempt counts the raw
    /// exponential overflows what a `Duration` can hold.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Pick the sleep for a failed attempt. A provider Retry-After hint wins
    /// over the computed backoff, still capped at `max_delay`.
    fn delay_for(&self, attempt: u32, err: &Error) -> Duration {
        match err.retry_after() {
            Some(hint) => hint.min(self.max_delay),
            None => self.backoff_delay(attempt),
        }
    }

    /// Run `op` under this policy.
    ///
    /// `op` is invoked at most `max_retries + 1` times. Attempts are logged
    /// with escalating severity as they accumulate.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    let kind = e.kind();
                    if !self.retry_on.contains(&kind) {
                        debug!(
                            attempt,
                            error_kind = kind.as_str(),
                            "failure not retryable, propagating"
                        );
                        return Err(e);
                    }
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            error_kind = kind.as_str(),
                            "retries exhausted: {}",
                            e
                        );
                        return Err(e);
                    }
                    let delay = self.delay_for(attempt, &e);
                    if attempt == 1 {
                        debug!(
                            attempt,
                            error_kind = kind.as_str(),
                            delay_ms = delay.as_millis() as u64,
                            "attempt failed, retrying"
                        );
                    } else {
                        warn!(
                            attempt,
                            error_kind = kind.as_str(),
                            delay_ms = delay.as_millis() as u64,
                            "attempt failed, retrying"
                        );
                    }
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
