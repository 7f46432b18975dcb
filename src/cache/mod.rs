//! Response caching.
//!
//! Generated content and image URLs are cached so identical requests never
//! hit the network twice within a TTL window. The module is split the same
//! way requests flow through it:
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheKey`] / key generators | SHA-256 keys from normalized request content |
//! | [`CacheBackend`] / [`MemoryCache`] | Bounded store with TTL expiry and strict LRU eviction |
//! | [`ResponseCache`] | Enablement, serde payloads, and hit/miss/eviction statistics |
//!
//! Cache failures are non-fatal: a broken backend degrades to miss
//! behavior and bumps an error counter instead of failing the caller.

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, MemoryCache, NullCache};
pub use key::{content_key, image_key, normalize_text, CacheKey};
pub use manager::{CacheConfig, CacheStats, ResponseCache};
