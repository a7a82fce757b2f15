//! LIKE patterns
//!
//! `%` matches any run of characters, `_` exactly one character, everything
//! else is literal. Matching is anchored and case-insensitive.

use std::fmt;

use regex::Regex;

/// A compiled LIKE pattern
#[derive(Clone)]
pub struct LikePattern {
    source: String,
    regex: Regex,
}

impl LikePattern {
    /// Compiles a LIKE pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push_str("(?is)^");
        let mut literal = [0u8; 4];
        for c in pattern.chars() {
            match c {
                '%' => expr.push_str(".*"),
                '_' => expr.push('.'),
                c => expr.push_str(&regex::escape(c.encode_utf8(&mut literal))),
            }
        }
        expr.push('$');
        Ok(Self {
            source: pattern.to_string(),
            regex: Regex::new(&expr)?,
        })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Tests a string against the pattern
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for LikePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LikePattern({:?})", self.source)
    }
}
