//! Cache backend implementations.

use super::key::CacheKey;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Entry {
    data: Vec<u8>,
    created_at: Instant,
    ttl: Duration,
    last_accessed: Instant,
}

impl Entry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            data,
            created_at: now,
            ttl,
            last_accessed: now,
        }
    }

    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// Storage seam under [`super::ResponseCache`].
///
/// `set` returns the number of live entries evicted to make room, so the
/// manager can keep an accurate eviction counter regardless of backend.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<u64>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
    async fn len(&self) -> Result<usize>;
    fn name(&self) -> &'static str;
}

/// In-memory store with lazy TTL expiry and strict LRU eviction.
///
/// Capacity is enforced on insert only; reads refresh `last_accessed` so a
/// recently read entry survives the next eviction.
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries: max_entries.max(1),
        }
    }

    /// Drop expired entries, then evict least-recently-accessed live entries
    /// until one slot is free. Returns how many live entries were evicted
    /// (expired removals are not evictions).
    fn make_room(&self, entries: &mut HashMap<String, Entry>) -> u64 {
        entries.retain(|_, e| !e.is_expired());
        let mut evicted = 0;
        while entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get_mut(&key.hash) {
            if entry.is_expired() {
                entries.remove(&key.hash);
                return Ok(None);
            }
            entry.last_accessed = Instant::now();
            return Ok(Some(entry.data.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<u64> {
        let mut entries = self.entries.write().unwrap();
        // Overwriting an existing key never needs room.
        let evicted = if entries.contains_key(&key.hash) {
            0
        } else {
            self.make_room(&mut entries)
        };
        entries.insert(key.hash.clone(), Entry::new(value.to_vec(), ttl));
        Ok(evicted)
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entries.write().unwrap().remove(&key.hash).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().unwrap().clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .values()
            .filter(|e| !e.is_expired())
            .count())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// No-op backend used when caching is disabled.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
    async fn set(&self, _: &CacheKey, _: &[u8], _: Duration) -> Result<u64> {
        Ok(0)
    }
    async fn delete(&self, _: &CacheKey) -> Result<bool> {
        Ok(false)
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
    fn name(&self) -> &'static str {
        "null"
    }
}
