//! Crate configuration.
//!
//! Settings are a nested structure deserialized from YAML. Every field has a
//! hard default, so a partial (or absent) file is fine. Precedence is
//! environment variable > file value > hard default; call
//! [`Settings::apply_env_overrides`] after loading to get the full chain.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{Error, Result};

/// Top-level settings for the generation core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub openai: OpenAiSettings,
    pub image: ImageApiSettings,
}

/// Chat/content API (OpenAI-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl OpenAiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

/// Asynchronous text-to-image API (submit task, poll for completion).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageApiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub size: String,
    pub timeout_secs: u64,
    /// Delay between `poll_task` calls for an in-flight generation task.
    pub poll_interval_secs: u64,
    /// Ceiling on the total time spent waiting for one task to complete.
    pub max_wait_secs: u64,
}

impl ImageApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ImageApiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            timeout_secs: 30,
            poll_interval_secs: 3,
            max_wait_secs: 180,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// TTL for generated content entries.
    pub ttl_secs: u64,
    /// TTL for image URL entries. Image URLs live much longer than content.
    pub image_ttl_secs: u64,
    pub max_size: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            image_ttl_secs: 86_400,
            max_size: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub openai: OpenAiRateLimit,
    pub image: ImageRateLimit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiRateLimit {
    pub requests_per_minute: u32,
    pub tokens_per_minute: u32,
    pub enable_rate_limit: bool,
}

impl Default for OpenAiRateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            tokens_per_minute: 90_000,
            enable_rate_limit: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageRateLimit {
    pub requests_per_minute: u32,
    pub enable_rate_limit: bool,
    /// Cap on simultaneously in-flight image tasks, independent of the RPM
    /// budget.
    pub max_concurrent: usize,
}

impl Default for ImageRateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 20,
            enable_rate_limit: true,
            max_concurrent: 3,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file, falling back to defaults for any
    /// missing key.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::validation(format!(
                "cannot read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw)
            .map_err(|e| Error::validation(format!("invalid config file: {}", e)))
    }

    /// Apply `POSTFORGE_*` environment variables on top of the current
    /// values. Unparseable numeric values are ignored rather than fatal.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("POSTFORGE_OPENAI_API_KEY") {
            self.api.openai.api_key = v;
        }
        if let Ok(v) = std::env::var("POSTFORGE_OPENAI_BASE_URL") {
            self.api.openai.base_url = v;
        }
        if let Ok(v) = std::env::var("POSTFORGE_OPENAI_MODEL") {
            self.api.openai.model = v;
        }
        if let Some(v) = env_parse::<u64>("POSTFORGE_OPENAI_TIMEOUT_SECS") {
            self.api.openai.timeout_secs = v;
        }
        if let Some(v) = env_parse::<u32>("POSTFORGE_OPENAI_MAX_RETRIES") {
            self.api.openai.max_retries = v;
        }
        if let Ok(v) = std::env::var("POSTFORGE_IMAGE_API_KEY") {
            self.api.image.api_key = v;
        }
        if let Ok(v) = std::env::var("POSTFORGE_IMAGE_BASE_URL") {
            self.api.image.base_url = v;
        }
        if let Ok(v) = std::env::var("POSTFORGE_IMAGE_MODEL") {
            self.api.image.model = v;
        }
        if let Ok(v) = std::env::var("POSTFORGE_IMAGE_SIZE") {
            self.api.image.size = v;
        }
        if let Some(v) = env_parse::<bool>("POSTFORGE_CACHE_ENABLED") {
            self.cache.enabled = v;
        }
        if let Some(v) = env_parse::<u64>("POSTFORGE_CACHE_TTL_SECS") {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = env_parse::<usize>("POSTFORGE_CACHE_MAX_SIZE") {
            self.cache.max_size = v;
        }
        if let Some(v) = env_parse::<u32>("POSTFORGE_OPENAI_RPM") {
            self.rate_limit.openai.requests_per_minute = v;
        }
        if let Some(v) = env_parse::<u32>("POSTFORGE_OPENAI_TPM") {
            self.rate_limit.openai.tokens_per_minute = v;
        }
        if let Some(v) = env_parse::<bool>("POSTFORGE_OPENAI_RATE_LIMIT") {
            self.rate_limit.openai.enable_rate_limit = v;
        }
        if let Some(v) = env_parse::<u32>("POSTFORGE_IMAGE_RPM") {
            self.rate_limit.image.requests_per_minute = v;
        }
        if let Some(v) = env_parse::<bool>("POSTFORGE_IMAGE_RATE_LIMIT") {
            self.rate_limit.image.enable_rate_limit = v;
        }
        if let Some(v) = env_parse::<usize>("POSTFORGE_IMAGE_MAX_CONCURRENT") {
            self.rate_limit.image.max_concurrent = v;
        }
        self
    }

    pub fn content_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn image_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.image_ttl_secs)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}
