//! Resilience primitives: retry with exponential backoff and token-bucket
//! rate limiting.
//!
//! Both components protect the outbound API calls made by the orchestration
//! layers:
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`retry::RetryPolicy`] | Wraps a fallible async operation, retrying whitelisted error kinds with exponential backoff |
//! | [`rate_limiter::RateLimiter`] | Rolling-minute token bucket for requests (and optionally tokens); blocks instead of failing |
//!
//! ```rust
//! use postforge::resilience::retry::RetryPolicy;
//! use postforge::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
//!
//! let retry = RetryPolicy::default().with_max_retries(3);
//! let limiter = RateLimiter::new(RateLimiterConfig::per_minute(60));
//! ```

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterSnapshot};
pub use retry::RetryPolicy;
