//! Retrieved passage

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A unit of retrieved text considered as candidate evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text
    pub text: String,
    /// Metadata supplied by the retriever (source path, page, score, ...)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub source_metadata: HashMap<String, serde_json::Value>,
}

impl Passage {
    /// Create a passage without metadata
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_metadata: HashMap::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.source_metadata.insert(key.into(), value);
        self
    }

    /// The `source` metadata entry, when it is a string
    pub fn source(&self) -> Option<&str> {
        self.source_metadata.get("source").and_then(|v| v.as_str())
    }
}
