//! LIKE patterns compiled to anchored regular expressions.
//!
//! `%` matches any run of characters (including none), `_` exactly one
//! character, and `\` escapes `%`, `_` or itself.

use regex::Regex;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LikePatternError {
    #[error("LIKE pattern ends with a dangling escape")]
    DanglingEscape,

    #[error("invalid escape sequence '\\{0}' in LIKE pattern")]
    InvalidEscape(char),

    #[error("LIKE pattern could not be compiled: {0}")]
    Compile(String),
}

/// A compiled LIKE pattern
#[derive(Clone)]
pub struct LikePattern {
    source: String,
    regex: Regex,
}

impl LikePattern {
    pub fn new(pattern: impl Into<String>) -> Result<Self, LikePatternError> {
        let source = pattern.into();
        let regex = Regex::new(&like_to_regex(&source)?)
            .map_err(|e| LikePatternError::Compile(e.to_string()))?;
        Ok(Self { source, regex })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whole-string match
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

fn like_to_regex(pattern: &str) -> Result<String, LikePatternError> {
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    out.push_str("(?s)^");

    let mut literal = [0u8; 4];
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped @ ('%' | '_' | '\\')) => {
                    out.push_str(&regex::escape(escaped.encode_utf8(&mut literal)))
                }
                Some(other) => return Err(LikePatternError::InvalidEscape(other)),
                None => return Err(LikePatternError::DanglingEscape),
            },
            other => out.push_str(&regex::escape(other.encode_utf8(&mut literal))),
        }
    }

    out.push('$');
    Ok(out)
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for LikePattern {}

impl fmt::Debug for LikePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LikePattern").field(&self.source).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn like(pattern: &str, text: &str) -> bool {
        LikePattern::new(pattern).unwrap().matches(text)
    }

    #[test]
    fn test_anchored_match() {
        assert!(like("event.%", "event.created"));
        assert!(!like("event.%", "xevent.created"));
        assert!(like("%.created", "order.created"));
        assert!(!like("%.created", "order.created.v2"));
        assert!(like("order", "order"));
        assert!(!like("order", "orders"));
    }

    #[test]
    fn test_wildcards() {
        assert!(like("%", ""));
        assert!(like("%", "anything"));
        assert!(like("a%b", "ab"));
        assert!(like("a_c", "abc"));
        assert!(!like("a_c", "ac"));
        assert!(!like("a_c", "abbc"));
        assert!(like("_", "é"));
        assert!(like("%x%", "a\nx\nb"));
        assert!(like("", ""));
        assert!(!like("", "a"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(like("a.b", "a.b"));
        assert!(!like("a.b", "axb"));
        assert!(like("(x)+[y]", "(x)+[y]"));
        assert!(like("$%^", "$ and ^"));
    }

    #[test]
    fn test_escapes() {
        assert!(like(r"100\%", "100%"));
        assert!(!like(r"100\%", "1000"));
        assert!(like(r"a\_b", "a_b"));
        assert!(!like(r"a\_b", "axb"));
        assert!(like(r"c:\\%", r"c:\temp"));

        assert_eq!(
            LikePattern::new(r"abc\").unwrap_err(),
            LikePatternError::DanglingEscape
        );
        assert_eq!(
            LikePattern::new(r"a\b").unwrap_err(),
            LikePatternError::InvalidEscape('b')
        );
    }

    #[test]
    fn test_pattern_equality() {
        assert_eq!(
            LikePattern::new("a%").unwrap(),
            LikePattern::new("a%").unwrap()
        );
        assert_eq!(LikePattern::new("a%").unwrap().as_str(), "a%");
    }
}
