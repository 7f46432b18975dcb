//! Generate post content and its images from a piece of raw source text.
//!
//! ```bash
//! export POSTFORGE_OPENAI_API_KEY=sk-...
//! export POSTFORGE_IMAGE_API_KEY=...
//! cargo run --example generate_post
//! ```

use std::sync::Arc;

use postforge::batch::{BatchImageDispatcher, DispatcherConfig};
use postforge::cache::{CacheConfig, ResponseCache};
use postforge::resilience::{RateLimiter, RateLimiterConfig};
use postforge::transport::{HttpChatApi, HttpImageApi};
use postforge::types::ImageRequest;
use postforge::{GenerationClient, Settings};

#[tokio::main]
async fn main() -> postforge::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::default().apply_env_overrides();

    let cache = Arc::new(ResponseCache::in_memory(CacheConfig::from_settings(
        &settings,
    )));
    let chat_limiter = Arc::new(RateLimiter::new(
        RateLimiterConfig::per_minute(settings.rate_limit.openai.requests_per_minute)
            .with_tokens_per_minute(settings.rate_limit.openai.tokens_per_minute)
            .with_enabled(settings.rate_limit.openai.enable_rate_limit),
    ));
    let image_limiter = Arc::new(RateLimiter::new(
        RateLimiterConfig::per_minute(settings.rate_limit.image.requests_per_minute)
            .with_enabled(settings.rate_limit.image.enable_rate_limit),
    ));

    let chat = Arc::new(HttpChatApi::new(&settings.api.openai)?);
    let client = GenerationClient::new(chat, cache.clone(), chat_limiter, &settings);

    let raw = "Beijing's hutong alleys are disappearing; notes from a walk \
               through Nanluoguxiang, interviews with longtime residents, \
               courtyard architecture details.";
    let content = client.generate(raw).await?;

    println!("body:\n{}\n", content.body);
    println!("titles: {:?}", content.titles);
    println!("tags: {:?}", content.tags);

    let image_api = Arc::new(HttpImageApi::new(&settings.api.image)?);
    let dispatcher = Arc::new(BatchImageDispatcher::new(
        image_api,
        cache,
        image_limiter,
        DispatcherConfig::from_settings(&settings),
    ));

    let requests: Vec<ImageRequest> = content
        .image_prompts
        .iter()
        .enumerate()
        .map(|(i, p)| ImageRequest::new(p.clone(), i))
        .collect();
    for result in dispatcher.generate_batch(requests).await {
        match (&result.image_url, &result.error) {
            (Some(url), _) => println!("image {}: {}", result.index, url),
            (None, Some(err)) => println!("image {} failed: {}", result.index, err),
            (None, None) => {}
        }
    }

    Ok(())
}
