use std::fmt::{self, Display};

use regex::Regex;
use thiserror::Error;

use crate::value::quote;

/// Error type for LIKE pattern compilation
#[derive(Debug, Error)]
pub enum LikePatternError {
    #[error("ESCAPE must be a single character, found {0:?}")]
    EscapeLength(String),

    #[error("pattern ends with the escape character")]
    DanglingEscape,

    #[error("Invalid regex pattern")]
    Regex(#[from] regex::Error),
}

/// Compiled `LIKE` pattern: `%` matches any sequence, `_` any single character.
#[derive(Debug, Clone)]
pub struct LikePattern {
    pattern: String,
    escape: Option<char>,
    regex: Regex,
}

impl LikePattern {
    pub fn new(pattern: &str, escape: Option<&str>) -> Result<Self, LikePatternError> {
        let escape = match escape {
            None => None,
            Some(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => return Err(LikePatternError::EscapeLength(s.to_string())),
                }
            }
        };

        let mut translated = String::with_capacity(pattern.len() + 8);
        translated.push_str("^(?s:");
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            if Some(c) == escape {
                let escaped = chars.next().ok_or(LikePatternError::DanglingEscape)?;
                translated.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
                continue;
            }
            match c {
                '%' => translated.push_str(".*"),
                '_' => translated.push('.'),
                c => translated.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        translated.push_str(")$");

        Ok(LikePattern {
            pattern: pattern.to_string(),
            escape,
            regex: Regex::new(&translated)?,
        })
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn escape(&self) -> Option<char> {
        self.escape
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.escape == other.escape
    }
}

impl Display for LikePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.pattern))?;
        if let Some(c) = self.escape {
            write!(f, " ESCAPE {}", quote(c.encode_utf8(&mut [0; 4])))?;
        }
        Ok(())
    }
}
