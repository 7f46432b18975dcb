//! Outbound API boundaries.
//!
//! The orchestration layers talk to the outside world through two narrow,
//! object-safe traits: [`ChatApi`] (one logical chat completion call) and
//! [`ImageApi`] (submit an asynchronous generation task, poll it, download
//! the result). Retry, rate limiting, and caching all treat these as black
//! boxes, and tests substitute in-process fakes.

mod chat;
mod image;

pub use chat::HttpChatApi;
pub use image::HttpImageApi;

use async_trait::async_trait;
use bytes::Bytes;

use crate::types::{Message, TaskPoll};
use crate::Result;

/// OpenAI-compatible chat completion endpoint.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send `messages` to `model` and return the assistant text.
    async fn chat(&self, model: &str, messages: &[Message]) -> Result<String>;
}

/// Asynchronous text-to-image endpoint (create, poll, download).
#[async_trait]
pub trait ImageApi: Send + Sync {
    async fn create_task(&self, prompt: &str, size: &str, model: &str) -> Result<String>;
    async fn poll_task(&self, task_id: &str) -> Result<TaskPoll>;
    async fn download(&self, url: &str) -> Result<Bytes>;
}

/// Provider error codes that mean the content itself was refused, across
/// the OpenAI-compatible surface and common image providers.
pub(crate) fn is_moderation_code(code: &str) -> bool {
    matches!(
        code,
        "content_policy_violation"
            | "content_filter"
            | "moderation_blocked"
            | "InputImageSensitiveContentDetected"
            | "OutputImageSensitiveContentDetected"
    )
}
