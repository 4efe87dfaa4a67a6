//! Term-overlap retriever over an in-memory passage list

use std::collections::HashSet;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::{DomainError, Passage, Retriever};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "how", "in",
        "is", "it", "of", "on", "or", "the", "to", "was", "what", "when", "where", "which", "who",
        "why", "with",
    ]
    .into_iter()
    .collect()
});

fn terms(text: &str) -> HashSet<String> {
    TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| !STOPWORDS.contains(t.as_str()))
        .collect()
}

#[derive(Debug)]
struct IndexedPassage {
    passage: Passage,
    terms: HashSet<String>,
}

/// Read-only lexical retriever.
///
/// Passages are ranked by the number of distinct question terms they
/// contain; passages sharing no term are never returned and equal scores
/// keep corpus order.
#[derive(Debug)]
pub struct InMemoryRetriever {
    passages: Vec<IndexedPassage>,
    top_k: usize,
}

impl InMemoryRetriever {
    pub fn new(passages: Vec<Passage>, top_k: usize) -> Self {
        let passages = passages
            .into_iter()
            .map(|passage| IndexedPassage {
                terms: terms(&passage.text),
                passage,
            })
            .collect();

        Self {
            passages,
            top_k: top_k.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    fn search(&self, question: &str) -> Vec<Passage> {
        let query = terms(question);
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &IndexedPassage)> = self
            .passages
            .iter()
            .map(|p| (query.iter().filter(|t| p.terms.contains(*t)).count(), p))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps corpus order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(self.top_k)
            .map(|(score, p)| {
                p.passage
                    .clone()
                    .with_metadata("retrieval_score", serde_json::json!(score))
            })
            .collect()
    }
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn retrieve(&self, question: &str) -> Result<Vec<Passage>, DomainError> {
        let found = self.search(question);
        debug!(
            candidates = self.passages.len(),
            returned = found.len(),
            "Lexical retrieval complete"
        );
        Ok(found)
    }

    fn retriever_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Passage> {
        vec![
            Passage::new("Paris is the capital of France."),
            Passage::new("The Eiffel Tower is in Paris, France."),
            Passage::new("Rust guarantees memory safety without a garbage collector."),
            Passage::new("Berlin is the capital of Germany."),
        ]
    }

    fn texts(passages: &[Passage]) -> Vec<&str> {
        passages.iter().map(|p| p.text.as_str()).collect()
    }

    #[tokio::test]
    async fn test_ranks_by_term_overlap() {
        let retriever = InMemoryRetriever::new(corpus(), 5);

        let found = retriever
            .retrieve("What is the capital of France?")
            .await
            .unwrap();

        assert_eq!(found[0].text, "Paris is the capital of France.");
        assert!(!texts(&found).contains(&"Rust guarantees memory safety without a garbage collector."));
        assert_eq!(found[0].source_metadata["retrieval_score"], 2);
    }

    #[tokio::test]
    async fn test_ties_keep_corpus_order() {
        let retriever = InMemoryRetriever::new(corpus(), 5);

        let found = retriever.retrieve("capital").await.unwrap();

        assert_eq!(
            texts(&found),
            vec!["Paris is the capital of France.", "Berlin is the capital of Germany."]
        );
    }

    #[tokio::test]
    async fn test_respects_top_k() {
        let retriever = InMemoryRetriever::new(corpus(), 1);
        let found = retriever.retrieve("capital France Paris").await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_no_overlap_returns_empty() {
        let retriever = InMemoryRetriever::new(corpus(), 5);

        assert!(retriever.retrieve("quantum chromodynamics").await.unwrap().is_empty());
        assert!(retriever.retrieve("what is the").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_case_insensitive() {
        let retriever = InMemoryRetriever::new(corpus(), 5);
        let found = retriever.retrieve("RUST").await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
