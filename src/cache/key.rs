//! Cache key derivation.
//!
//! Text keys are whitespace-insensitive: the input is trimmed and every
//! internal whitespace run collapses to a single space before hashing, so
//! copies of the same content that differ only in formatting share one
//! entry. Case is preserved; `"Foo"` and `"foo"` are distinct. Image keys
//! hash the `(prompt, size, model)` triple, canonicalized as sorted JSON so
//! field order can never perturb the hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

/// Trim and collapse internal whitespace runs to single spaces.
pub fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Key for a content generation request: hash of the normalized input plus
/// the model that will serve it.
pub fn content_key(raw_content: &str, model: &str) -> CacheKey {
    let mut parts: BTreeMap<&str, String> = BTreeMap::new();
    parts.insert("content", normalize_text(raw_content));
    parts.insert("model", model.to_string());
    let canonical = serde_json::to_string(&parts).unwrap_or_default();
    CacheKey::new(sha256_hex(canonical.as_bytes()))
}

/// Key for an image generation request: `(prompt, size, model)`.
pub fn image_key(prompt: &str, size: &str, model: &str) -> CacheKey {
    let mut parts: BTreeMap<&str, String> = BTreeMap::new();
    parts.insert("prompt", normalize_text(prompt));
    parts.insert("size", size.to_string());
    parts.insert("model", model.to_string());
    let canonical = serde_json::to_string(&parts).unwrap_or_default();
    CacheKey::new(sha256_hex(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  hello\t\nworld  "), "hello world");
        assert_eq!(normalize_text("a  b   c"), "a b c");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_whitespace_variants_share_a_key() {
        let a = content_key("老北京的胡同文化", "gpt-4o-mini");
        let b = content_key("  老北京的胡同文化\n", "gpt-4o-mini");
        assert_eq!(a, b);
    }

    #[test]
    fn test_case_differences_do_not_collide() {
        let a = content_key("Hutong Culture", "gpt-4o-mini");
        let b = content_key("hutong culture", "gpt-4o-mini");
        assert_ne!(a, b);
    }

    #[test]
    fn test_model_is_part_of_content_key() {
        let a = content_key("same text", "gpt-4o-mini");
        let b = content_key("same text", "gpt-4o");
        assert_ne!(a, b);
    }

    #[test]
    fn test_image_key_includes_all_parameters() {
        let base = image_key("a red lantern", "1024x1024", "dall-e-3");
        assert_ne!(base, image_key("a red lantern", "512x512", "dall-e-3"));
        assert_ne!(base, image_key("a red lantern", "1024x1024", "dall-e-2"));
        assert_ne!(base, image_key("a blue lantern", "1024x1024", "dall-e-3"));
        assert_eq!(base, image_key(" a  red lantern ", "1024x1024", "dall-e-3"));
    }

    #[test]
    fn test_key_is_hex_sha256() {
        let k = content_key("x", "m");
        assert_eq!(k.hash.len(), 64);
        assert!(k.hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
