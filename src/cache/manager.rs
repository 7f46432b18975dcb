//! Cache manager: enablement, serde payloads, statistics.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::warn;

use super::backend::CacheBackend;
use super::key::CacheKey;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub default_ttl: Duration,
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: Duration::from_secs(3600),
            max_size: 100,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        Self {
            enabled: settings.cache.enabled,
            default_ttl: settings.content_ttl(),
            max_size: settings.cache.max_size,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub errors: u64,
    pub hit_rate: f64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    errors: AtomicU64,
}

/// Response cache shared by the content and image orchestrators.
///
/// All failure paths degrade to miss behavior: a backend or decode error is
/// logged and counted, never surfaced to the caller.
pub struct ResponseCache {
    config: CacheConfig,
    backend: Box<dyn CacheBackend>,
    counters: Counters,
}

impl ResponseCache {
    pub fn new(config: CacheConfig, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            counters: Counters::default(),
        }
    }

    /// In-memory cache sized from the config. Disabled configs get a
    /// null backend so `set` is a true no-op.
    pub fn in_memory(config: CacheConfig) -> Self {
        let backend: Box<dyn CacheBackend> = if config.enabled {
            Box::new(super::backend::MemoryCache::new(config.max_size))
        } else {
            Box::new(super::backend::NullCache::new())
        };
        Self::new(config, backend)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if !self.config.enabled {
            return None;
        }
        match self.backend.get(key).await {
            Ok(Some(data)) => match serde_json::from_slice(&data) {
                Ok(value) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    Some(value)
                }
                Err(e) => {
                    warn!(key = key.as_str(), "cached payload undecodable: {}", e);
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    None
                }
            },
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!(key = key.as_str(), "cache get failed: {}", e);
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T) {
        self.set_with_ttl(key, value, self.config.default_ttl).await;
    }

    pub async fn set_with_ttl<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if !self.config.enabled {
            return;
        }
        let data = match serde_json::to_vec(value) {
            Ok(d) => d,
            Err(e) => {
                warn!(key = key.as_str(), "cache encode failed: {}", e);
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        match self.backend.set(key, &data, ttl).await {
            Ok(evicted) => {
                if evicted > 0 {
                    self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
                }
            }
            Err(e) => {
                warn!(key = key.as_str(), "cache set failed: {}", e);
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub async fn delete(&self, key: &CacheKey) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.backend.delete(key).await.unwrap_or_else(|e| {
            warn!(key = key.as_str(), "cache delete failed: {}", e);
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            false
        })
    }

    pub async fn clear(&self) {
        if let Err(e) = self.backend.clear().await {
            warn!("cache clear failed: {}", e);
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            size: self.backend.len().await.unwrap_or(0),
            max_size: self.config.max_size,
            hits,
            misses,
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::content_key;

    fn cache(max_size: usize) -> ResponseCache {
        ResponseCache::in_memory(CacheConfig::new().with_max_size(max_size))
    }

    #[tokio::test]
    async fn test_miss_then_hit_statistics() {
        let cache = cache(4);
        let key = content_key("hello", "m");

        assert!(cache.get::<String>(&key).await.is_none());
        cache.set(&key, &"world".to_string()).await;
        assert_eq!(cache.get::<String>(&key).await.unwrap(), "world");

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_hit_rate_zero_without_accesses() {
        let stats = cache(4).stats().await;
        assert_eq!(stats.hit_rate, 0.0);
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[tokio::test]
    async fn test_eviction_counter_tracks_lru_evictions() {
        let cache = cache(2);
        for i in 0..4 {
            let key = content_key(&format!("item {}", i), "m");
            cache.set(&key, &i).await;
            tokio::time::sleep(std::time::Duration::from_millis(3)).await;
        }
        let stats = cache.stats().await;
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.size, 2);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = ResponseCache::in_memory(CacheConfig::new().with_enabled(false));
        let key = content_key("x", "m");
        cache.set(&key, &"value".to_string()).await;
        assert!(cache.get::<String>(&key).await.is_none());
        assert_eq!(cache.backend_name(), "null");
        // Disabled short-circuits entirely: not even a miss is recorded.
        assert_eq!(cache.stats().await.misses, 0);
    }

    #[tokio::test]
    async fn test_ttl_override_per_entry() {
        let cache = cache(4);
        let key = content_key("volatile", "m");
        cache
            .set_with_ttl(&key, &1u32, Duration::from_millis(25))
            .await;
        assert!(cache.get::<u32>(&key).await.is_some());
        tokio::time::sleep(Duration::from_millis(35)).await;
        assert!(cache.get::<u32>(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_payload_degrades_to_miss() {
        let cache = cache(4);
        let key = content_key("shape change", "m");
        cache.set(&key, &"just a string".to_string()).await;
        // Ask for a different shape than what was stored.
        assert!(cache.get::<Vec<u32>>(&key).await.is_none());
        let stats = cache.stats().await;
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_clear_resets_contents_but_not_counters() {
        let cache = cache(4);
        let key = content_key("a", "m");
        cache.set(&key, &1u32).await;
        cache.get::<u32>(&key).await;
        cache.clear().await;
        let stats = cache.stats().await;
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 1);
    }
}
