//! Context assembly from filtered passages

use tracing::warn;

use crate::domain::retrieval::Passage;

/// Separator placed between passage texts
pub const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";
/// Marker appended after a cut context
pub const TRUNCATION_MARKER: &str = "\n\n[Context truncated...]";

/// Joins passages into one bounded-length context string
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_length: usize,
}

impl ContextAssembler {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Join passage texts and truncate to `max_length` characters
    pub fn assemble(&self, passages: &[Passage]) -> String {
        let joined = passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR);

        truncate_context(&joined, self.max_length)
    }
}

/// Cut `text` to `max_length` characters and append [`TRUNCATION_MARKER`].
///
/// Text already within the bound is returned unchanged, and so is text that
/// was produced by an earlier truncation at the same bound.
pub fn truncate_context(text: &str, max_length: usize) -> String {
    let length = text.chars().count();
    if length <= max_length {
        return text.to_string();
    }

    if let Some(body) = text.strip_suffix(TRUNCATION_MARKER) {
        if body.chars().count() <= max_length {
            return text.to_string();
        }
    }

    warn!(
        length,
        max_length, "Context length exceeds maximum, truncating"
    );

    let cut: String = text.chars().take(max_length).collect();
    format!("{}{}", cut, TRUNCATION_MARKER)
}
