//! Core type definitions shared across the orchestration layers.

use serde::{Deserialize, Serialize};

/// A single chat message sent to the content API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Output of one content generation call: the pieces a publishing layer
/// assembles into a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResult {
    pub titles: Vec<String>,
    pub body: String,
    pub tags: Vec<String>,
    pub image_prompts: Vec<String>,
}

/// One unit of work submitted to the batch image dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    /// Position in the submitted batch; results are re-sorted by this.
    pub index: usize,
    #[serde(default)]
    pub is_cover: bool,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, index: usize) -> Self {
        Self {
            prompt: prompt.into(),
            index,
            is_cover: false,
        }
    }

    pub fn cover(mut self) -> Self {
        self.is_cover = true;
        self
    }
}

/// Per-unit outcome of a batch image generation. A failed unit carries its
/// error message; it never affects sibling units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResult {
    pub index: usize,
    pub prompt: String,
    pub is_cover: bool,
    pub success: bool,
    pub image_url: Option<String>,
    pub error: Option<String>,
    /// True when the URL came from the cache and no remote task was created.
    #[serde(default)]
    pub from_cache: bool,
}

impl ImageResult {
    pub fn success(request: &ImageRequest, image_url: impl Into<String>) -> Self {
        Self {
            index: request.index,
            prompt: request.prompt.clone(),
            is_cover: request.is_cover,
            success: true,
            image_url: Some(image_url.into()),
            error: None,
            from_cache: false,
        }
    }

    pub fn failure(request: &ImageRequest, error: impl Into<String>) -> Self {
        Self {
            index: request.index,
            prompt: request.prompt.clone(),
            is_cover: request.is_cover,
            success: false,
            image_url: None,
            error: Some(error.into()),
            from_cache: false,
        }
    }

    pub fn cached(mut self) -> Self {
        self.from_cache = true;
        self
    }
}

/// Remote task state reported by the image API while polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

/// One `poll_task` observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPoll {
    pub status: TaskStatus,
    pub image_url: Option<String>,
    pub error: Option<String>,
}
