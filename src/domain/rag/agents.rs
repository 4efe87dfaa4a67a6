//! Model-backed collaborators used by the answer pipeline

use async_trait::async_trait;
use std::fmt::Debug;

use super::types::{Evaluation, RelevanceVerdict};
use crate::domain::DomainError;

/// Decides whether a passage can help answer a question
#[async_trait]
pub trait RelevanceClassifier: Send + Sync + Debug {
    async fn classify(
        &self,
        question: &str,
        passage_text: &str,
    ) -> Result<RelevanceVerdict, DomainError>;
}

/// Produces an answer using only the supplied context
#[async_trait]
pub trait AnswerGenerator: Send + Sync + Debug {
    async fn generate(&self, question: &str, context: &str) -> Result<String, DomainError>;
}

/// Scores how well an answer is supported by its context (1-5)
#[async_trait]
pub trait AnswerScorer: Send + Sync + Debug {
    async fn score(&self, answer: &str, context: &str) -> Result<Evaluation, DomainError>;
}
