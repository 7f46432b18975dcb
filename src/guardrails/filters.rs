//! Content filtering implementations.

/// A rule match found in checked content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The keyword or regex source that matched.
    pub pattern: String,
    /// The text span that triggered the match.
    pub matched_text: String,
}

/// Trait for content filters.
pub trait ContentFilter: Send + Sync {
    fn check(&self, content: &str) -> Vec<Violation>;
}

/// Case-insensitive substring filter.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<(String, String)>, // (original, lowercase)
}

impl KeywordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&mut self, keyword: impl Into<String>) {
        let keyword = keyword.into();
        let lower = keyword.to_lowercase();
        self.keywords.push((keyword, lower));
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

impl ContentFilter for KeywordFilter {
    fn check(&self, content: &str) -> Vec<Violation> {
        let content_lower = content.to_lowercase();
        self.keywords
            .iter()
            .filter(|(_, lower)| content_lower.contains(lower.as_str()))
            .map(|(original, _)| Violation {
                pattern: original.clone(),
                matched_text: original.clone(),
            })
            .collect()
    }
}

/// Regex filter. Patterns are compiled once at registration; invalid
/// patterns are dropped with a warning rather than failing the gate.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    patterns: Vec<regex::Regex>,
}

impl PatternFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        match regex::Regex::new(&pattern) {
            Ok(re) => self.patterns.push(re),
            Err(e) => tracing::warn!(pattern = pattern.as_str(), "invalid filter pattern: {}", e),
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl ContentFilter for PatternFilter {
    fn check(&self, content: &str) -> Vec<Violation> {
        self.patterns
            .iter()
            .filter_map(|re| {
                re.find(content).map(|m| Violation {
                    pattern: re.as_str().to_string(),
                    matched_text: m.as_str().to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_filter_case_insensitive() {
        let mut f = KeywordFilter::new();
        f.block("Secret Project");
        assert_eq!(f.check("about the SECRET project launch").len(), 1);
        assert!(f.check("nothing to see").is_empty());
    }

    #[test]
    fn test_pattern_filter_reports_matched_text() {
        let mut f = PatternFilter::new();
        f.block(r"\b\d{3}-\d{4}\b");
        let found = f.check("call 555-0199 now");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched_text, "555-0199");
    }

    #[test]
    fn test_invalid_pattern_is_dropped() {
        let mut f = PatternFilter::new();
        f.block("([unclosed");
        assert!(f.is_empty());
        assert!(f.check("anything").is_empty());
    }
}
