//! Question validation and sanitization

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::domain::DomainError;

/// Phrases that commonly show up in prompt-injection attempts.
/// Matches are logged for monitoring; they never reject a question.
static SUSPICIOUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)ignore\s+previous\s+instructions",
        r"(?i)ignore\s+all\s+previous",
        r"(?i)disregard\s+previous",
        r"(?i)system\s*:\s*you\s+are",
        r"(?i)<\s*script\s*>",
        r"(?i)javascript\s*:",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// A validated, sanitized, non-empty question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    /// Validate and sanitize a raw question.
    ///
    /// The length bound applies to the raw input, counted in characters.
    pub fn parse(raw: &str, max_length: usize, sanitize: bool) -> Result<Self, DomainError> {
        if raw.trim().is_empty() {
            return Err(DomainError::validation("Query cannot be empty"));
        }

        let length = raw.chars().count();
        if length > max_length {
            return Err(DomainError::validation(format!(
                "Query exceeds maximum length of {} characters",
                max_length
            )));
        }

        for pattern in SUSPICIOUS_PATTERNS.iter() {
            if pattern.is_match(raw) {
                warn!(pattern = %pattern.as_str(), "Suspicious pattern detected in query");
            }
        }

        let cleaned = if sanitize {
            sanitize_text(raw)
        } else {
            raw.trim().to_string()
        };

        if cleaned.is_empty() {
            return Err(DomainError::validation("Query cannot be empty"));
        }

        Ok(Self(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Question {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Drop non-whitespace control characters, then collapse whitespace runs
fn sanitize_text(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();

    WHITESPACE_RUN
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}
