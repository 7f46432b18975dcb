//! Content generation orchestration.
//!
//! [`GenerationClient`] composes the crate's resilience pieces around the
//! chat API. Per request the flow is: safety check → cache lookup →
//! rate-limit acquire → chat call under retry → self-review loop (bounded)
//! → cache store. The cache and limiter are injected handles, shared with
//! whatever else the process runs; the client holds no hidden global state.

mod review;

pub use review::Review;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{content_key, CacheStats, ResponseCache};
use crate::config::Settings;
use crate::guardrails::SafetyGate;
use crate::resilience::{RateLimiter, RetryPolicy};
use crate::transport::ChatApi;
use crate::types::{ContentResult, Message};
use crate::Result;

/// Hard cap on generation attempts within one `generate` call, counting the
/// first draft. Bounds cost and latency regardless of evaluator verdicts.
const MAX_GENERATION_ATTEMPTS: u32 = 3;

pub struct GenerationClient {
    chat: Arc<dyn ChatApi>,
    cache: Arc<ResponseCache>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    safety: SafetyGate,
    model: String,
    content_ttl: Duration,
}

impl GenerationClient {
    pub fn new(
        chat: Arc<dyn ChatApi>,
        cache: Arc<ResponseCache>,
        limiter: Arc<RateLimiter>,
        settings: &Settings,
    ) -> Self {
        let retry = RetryPolicy::new().with_max_retries(settings.api.openai.max_retries);
        Self {
            chat,
            cache,
            limiter,
            retry,
            safety: SafetyGate::new(),
            model: settings.api.openai.model.clone(),
            content_ttl: settings.content_ttl(),
        }
    }

    pub fn with_safety_gate(mut self, safety: SafetyGate) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Rough token estimate used as the limiter cost for one call. Four
    /// characters per token, plus a flat completion allowance.
    fn token_cost(input: &str) -> u32 {
        (input.chars().count() as u32 / 4).saturating_add(800)
    }

    async fn chat_with_retry(&self, messages: Vec<Message>) -> Result<String> {
        self.retry
            .run(|| {
                let messages = messages.clone();
                async move { self.chat.chat(&self.model, &messages).await }
            })
            .await
    }

    /// Generate post content from raw source material.
    ///
    /// Fails with the last underlying error once retries are exhausted; a
    /// cached result is never substituted for a failed live call.
    pub async fn generate(&self, raw_content: &str) -> Result<ContentResult> {
        // Reject unsafe input before consuming any rate-limit budget.
        self.safety.check(raw_content)?;

        let key = content_key(raw_content, &self.model);
        if let Some(hit) = self.cache.get::<ContentResult>(&key).await {
            debug!(key = key.as_str(), "content cache hit");
            return Ok(hit);
        }

        let cost = Self::token_cost(raw_content);
        self.limiter.acquire(cost).await?;

        let mut feedback: Option<String> = None;
        let mut attempt: u32 = 0;

        let result = loop {
            attempt += 1;
            let messages = review::generation_messages(raw_content, feedback.as_deref());
            let text = self.chat_with_retry(messages).await?;

            let draft = match review::parse_content(&text) {
                Ok(d) => d,
                Err(e) if attempt < MAX_GENERATION_ATTEMPTS => {
                    // Malformed drafts burn an attempt like any other
                    // deficiency; the regeneration prompt says why.
                    warn!(attempt, "discarding malformed draft: {}", e);
                    feedback = Some(format!("previous reply was not usable ({})", e));
                    continue;
                }
                Err(e) => return Err(e),
            };

            // The final attempt is kept as-is; a review could no longer
            // trigger a regeneration.
            if attempt >= MAX_GENERATION_ATTEMPTS {
                break draft;
            }

            self.limiter.acquire(Self::token_cost("")).await?;
            let verdict_text = self.chat_with_retry(review::review_messages(&draft)).await?;
            let verdict = review::parse_review(&verdict_text);
            if verdict.pass {
                break draft;
            }
            info!(
                attempt,
                feedback = verdict.feedback.as_str(),
                "draft failed self-review, regenerating"
            );
            feedback = Some(verdict.feedback);
        };
        self.cache
            .set_with_ttl(&key, &result, self.content_ttl)
            .await;
        Ok(result)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}
