//! Batch dispatcher implementation.

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cache::{image_key, CacheStats, ResponseCache};
use crate::config::Settings;
use crate::resilience::{RateLimiter, RetryPolicy};
use crate::transport::ImageApi;
use crate::types::{ImageRequest, ImageResult, TaskStatus};
use crate::{Error, ErrorKind, Result};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub model: String,
    pub size: String,
    pub max_concurrent: usize,
    pub poll_interval: Duration,
    /// Ceiling on the total wait for one remote task, submission to
    /// terminal state.
    pub max_wait: Duration,
    pub image_ttl: Duration,
}

impl DispatcherConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.api.image.model.clone(),
            size: settings.api.image.size.clone(),
            max_concurrent: settings.rate_limit.image.max_concurrent.max(1),
            poll_interval: Duration::from_secs(settings.api.image.poll_interval_secs.max(1)),
            max_wait: Duration::from_secs(settings.api.image.max_wait_secs),
            image_ttl: settings.image_ttl(),
        }
    }
}

pub struct BatchImageDispatcher {
    api: Arc<dyn ImageApi>,
    cache: Arc<ResponseCache>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    config: DispatcherConfig,
}

impl BatchImageDispatcher {
    pub fn new(
        api: Arc<dyn ImageApi>,
        cache: Arc<ResponseCache>,
        limiter: Arc<RateLimiter>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            api,
            cache,
            limiter,
            retry: RetryPolicy::default(),
            config,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Generate every prompt in `requests` concurrently, at most
    /// `max_concurrent` in flight at once.
    ///
    /// The returned vector always has one entry per request, sorted by the
    /// request's `index` (completion order is not submission order). Unit
    /// failures, timeouts, and task panics all land in their own slot.
    pub async fn generate_batch(self: &Arc<Self>, requests: Vec<ImageRequest>) -> Vec<ImageResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let total = requests.len();
        info!(
            total,
            max_concurrent = self.config.max_concurrent,
            "dispatching image batch"
        );

        let mut metas = Vec::with_capacity(total);
        let mut handles = Vec::with_capacity(total);
        for request in requests {
            let dispatcher = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            metas.push(request.clone());
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => {
                        return ImageResult::failure(&request, "dispatch semaphore closed");
                    }
                };
                dispatcher.run_unit(request).await
            }));
        }

        let mut results = Vec::with_capacity(total);
        for (meta, outcome) in metas.iter().zip(join_all(handles).await) {
            match outcome {
                Ok(result) => results.push(result),
                // A panicked unit gets a failure slot; it must not poison
                // the batch.
                Err(e) => {
                    warn!(index = meta.index, "image unit task panicked: {}", e);
                    results.push(ImageResult::failure(meta, format!("unit panicked: {}", e)));
                }
            }
        }
        results.sort_by_key(|r| r.index);
        results
    }

    /// One unit: cache → rate limit → generate with retry, with a single
    /// prompt-simplification pass when moderation rejects the original.
    async fn run_unit(&self, request: ImageRequest) -> ImageResult {
        let key = image_key(&request.prompt, &self.config.size, &self.config.model);
        if let Some(url) = self.cache.get::<String>(&key).await {
            debug!(index = request.index, "image cache hit");
            return ImageResult::success(&request, url).cached();
        }

        match self.generate_one(&request.prompt).await {
            Ok(url) => {
                self.cache
                    .set_with_ttl(&key, &url, self.config.image_ttl)
                    .await;
                ImageResult::success(&request, url)
            }
            Err(e) if e.kind() == ErrorKind::Moderation => {
                let simplified = simplify_prompt(&request.prompt);
                info!(
                    index = request.index,
                    "prompt rejected by moderation, retrying simplified"
                );
                match self.generate_one(&simplified).await {
                    Ok(url) => {
                        self.cache
                            .set_with_ttl(&key, &url, self.config.image_ttl)
                            .await;
                        ImageResult::success(&request, url)
                    }
                    Err(e2) => ImageResult::failure(&request, e2.to_string()),
                }
            }
            Err(e) => ImageResult::failure(&request, e.to_string()),
        }
    }

    async fn generate_one(&self, prompt: &str) -> Result<String> {
        self.limiter.acquire(1).await?;
        self.retry
            .run(|| async move {
                let task_id = self
                    .api
                    .create_task(prompt, &self.config.size, &self.config.model)
                    .await?;
                self.poll_until_complete(&task_id).await
            })
            .await
    }

    /// Poll at a fixed interval until the task terminates or `max_wait`
    /// elapses. Exceeding the ceiling is a `Timeout` failure for the unit,
    /// not a crash.
    async fn poll_until_complete(&self, task_id: &str) -> Result<String> {
        let start = Instant::now();
        loop {
            let poll = self.api.poll_task(task_id).await?;
            match poll.status {
                TaskStatus::Succeeded => {
                    return poll.image_url.ok_or_else(|| Error::Api {
                        status: 200,
                        message: format!("task {} succeeded without an image url", task_id),
                    });
                }
                TaskStatus::Failed => {
                    return Err(Error::Api {
                        status: 200,
                        message: poll
                            .error
                            .unwrap_or_else(|| format!("task {} failed", task_id)),
                    });
                }
                TaskStatus::Pending | TaskStatus::Processing => {
                    if start.elapsed() >= self.config.max_wait {
                        return Err(Error::timeout(
                            format!("image task {}", task_id),
                            start.elapsed(),
                        ));
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}

/// Strip decorative trailing clauses from a moderated prompt: keep the
/// first two comma-separated segments and pin a neutral style.
fn simplify_prompt(prompt: &str) -> String {
    let core: Vec<&str> = prompt.splitn(3, [',', '，']).collect();
    let kept = core[..core.len().min(2)].join(",");
    format!("{}, simple clean illustration", kept.trim())
}
