//! Input safety checks.
//!
//! Content is screened locally before it consumes any rate-limit budget or
//! reaches a provider. The gate combines a keyword filter and a regex
//! pattern filter; any blocking violation rejects the request with a
//! `Validation` error.

mod filters;

pub use filters::{ContentFilter, KeywordFilter, PatternFilter, Violation};

use once_cell::sync::Lazy;

use crate::{Error, Result};

/// Keywords blocked by default. Deliberately small; deployments extend the
/// gate with their own rules.
static DEFAULT_BLOCKLIST: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["ignore previous instructions", "disregard your system prompt"]);

/// Patterns blocked by default: things that look like leaked credentials.
static DEFAULT_PATTERNS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec![r"sk-[A-Za-z0-9]{20,}", r"-----BEGIN [A-Z ]*PRIVATE KEY-----"]);

/// Local content-safety gate applied to raw input.
pub struct SafetyGate {
    keywords: KeywordFilter,
    patterns: PatternFilter,
}

impl SafetyGate {
    /// Gate with the built-in rule set.
    pub fn new() -> Self {
        let mut keywords = KeywordFilter::new();
        for kw in DEFAULT_BLOCKLIST.iter() {
            keywords.block(*kw);
        }
        let mut patterns = PatternFilter::new();
        for p in DEFAULT_PATTERNS.iter() {
            patterns.block(*p);
        }
        Self { keywords, patterns }
    }

    /// Empty gate; everything passes until rules are added.
    pub fn permissive() -> Self {
        Self {
            keywords: KeywordFilter::new(),
            patterns: PatternFilter::new(),
        }
    }

    pub fn block_keyword(&mut self, keyword: impl Into<String>) -> &mut Self {
        self.keywords.block(keyword);
        self
    }

    pub fn block_pattern(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.patterns.block(pattern);
        self
    }

    /// All violations found in `content`, across both filters.
    pub fn violations(&self, content: &str) -> Vec<Violation> {
        let mut found = self.keywords.check(content);
        found.extend(self.patterns.check(content));
        found
    }

    /// Reject `content` if any rule matches. Runs locally, before any
    /// rate-limit budget is spent.
    pub fn check(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(Error::validation("input content is empty"));
        }
        let violations = self.violations(content);
        if let Some(v) = violations.first() {
            return Err(Error::validation(format!(
                "input blocked by safety filter: {}",
                v.pattern
            )));
        }
        Ok(())
    }
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_input_passes() {
        let gate = SafetyGate::new();
        assert!(gate.check("a travel article about Beijing hutongs").is_ok());
    }

    #[test]
    fn test_empty_input_rejected() {
        let gate = SafetyGate::permissive();
        let err = gate.check("   \n ").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_blocked_keyword_rejected_case_insensitively() {
        let mut gate = SafetyGate::permissive();
        gate.block_keyword("forbidden topic");
        let err = gate.check("Writing about a FORBIDDEN Topic today").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_default_pattern_catches_api_keys() {
        let gate = SafetyGate::new();
        assert!(gate
            .check("my key is sk-abcdefghijklmnopqrstuvwxyz123456")
            .is_err());
    }

    #[test]
    fn test_violations_reported_from_both_filters() {
        let mut gate = SafetyGate::permissive();
        gate.block_keyword("spam");
        gate.block_pattern(r"\d{16}");
        let found = gate.violations("spam with card 4111111111111111");
        assert_eq!(found.len(), 2);
    }
}
