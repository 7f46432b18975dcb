//! # postforge
//!
//! Resilient orchestration layer for LLM-backed post generation: content
//! drafting with bounded self-review, plus concurrent text-to-image
//! dispatch, wrapped in the caching, rate limiting, and retry machinery the
//! upstream APIs demand.
//!
//! ## Overview
//!
//! The crate turns raw source material into publishable post content
//! (titles, body, tags, image prompts) and renders the image prompts
//! through an asynchronous task-based image API. Every remote call runs
//! through the same resilience pipeline:
//!
//! - **Caching**: normalized, hashed request keys with TTL and LRU
//!   eviction, so identical inputs never pay for a second generation.
//! - **Rate limiting**: token buckets for requests/minute and
//!   tokens/minute, with bounded blocking acquisition.
//! - **Retry**: exponential backoff with provider `Retry-After` hints,
//!   retrying only error kinds that can actually recover.
//! - **Safety**: input guardrails reject prompt-injection and leaked
//!   credentials before any budget is spent.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use postforge::{
//!     cache::{CacheConfig, ResponseCache},
//!     resilience::{RateLimiter, RateLimiterConfig},
//!     transport::HttpChatApi,
//!     GenerationClient, Settings,
//! };
//!
//! #[tokio::main]
//! async fn main() -> postforge::Result<()> {
//!     let settings = Settings::from_yaml_file("config.yaml")?.apply_env_overrides();
//!     let chat = Arc::new(HttpChatApi::new(&settings.api.openai)?);
//!     let cache = Arc::new(ResponseCache::in_memory(CacheConfig::from_settings(&settings)));
//!     let limiter = Arc::new(RateLimiter::new(
//!         RateLimiterConfig::per_minute(settings.rate_limit.openai.requests_per_minute)
//!             .with_tokens_per_minute(settings.rate_limit.openai.tokens_per_minute),
//!     ));
//!
//!     let client = GenerationClient::new(chat, cache, limiter, &settings);
//!     let content = client.generate("raw source material").await?;
//!     println!("{}", content.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Content generation with bounded self-review |
//! | [`batch`] | Concurrent batch image dispatch |
//! | [`transport`] | HTTP bindings for the chat and image APIs |
//! | [`cache`] | Response caching (keys, backends, stats) |
//! | [`resilience`] | Retry policy and rate limiting |
//! | [`guardrails`] | Input safety filtering |
//! | [`config`] | YAML + environment configuration |
//! | [`types`] | Shared message/result/task types |

pub mod batch;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod guardrails;
pub mod resilience;
pub mod transport;
pub mod types;

// Re-export the types most callers need directly.
pub use batch::{BatchImageDispatcher, DispatcherConfig};
pub use client::GenerationClient;
pub use config::Settings;
pub use error::{Error, ErrorKind};
pub use types::{ContentResult, ImageRequest, ImageResult, Message, MessageRole};

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, Error>;
