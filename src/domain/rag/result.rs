//! Terminal record returned for every query

use serde::{Deserialize, Serialize};

use super::types::Attempt;

/// Answer returned when no usable evidence exists
pub const NO_INFORMATION_ANSWER: &str =
    "I could not find any relevant information to answer this question.";

/// Final outcome of one pipeline run, serialized as a flat record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub question: String,
    pub answer: String,
    /// 1-5 for answered queries, 0 for empty-evidence and failed runs
    pub score: u8,
    pub score_justification: String,
    pub source_context: String,
    pub documents_retrieved: usize,
    pub documents_after_filter: usize,
    pub correction_attempts: u32,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PipelineResult {
    /// Wrap the attempt chosen by the correction loop
    pub fn from_attempt(
        question: impl Into<String>,
        attempt: Attempt,
        source_context: impl Into<String>,
        documents_retrieved: usize,
        documents_after_filter: usize,
        correction_attempts: u32,
    ) -> Self {
        let score = attempt.score();
        let Attempt {
            answer, evaluation, ..
        } = attempt;

        Self {
            question: question.into(),
            answer,
            score,
            score_justification: evaluation.justification().to_string(),
            source_context: source_context.into(),
            documents_retrieved,
            documents_after_filter,
            correction_attempts,
            success: true,
            error_message: None,
        }
    }

    /// Retrieval returned nothing
    pub fn no_documents(question: impl Into<String>) -> Self {
        Self::empty_evidence(
            question,
            0,
            "No documents retrieved",
            "No documents retrieved",
        )
    }

    /// Every retrieved passage was judged irrelevant
    pub fn no_relevant_documents(question: impl Into<String>, documents_retrieved: usize) -> Self {
        Self::empty_evidence(
            question,
            documents_retrieved,
            "No relevant context found after filtering",
            "No relevant documents after filtering",
        )
    }

    /// Run aborted by an error; counts are whatever was observed before it
    pub fn failed(
        question: impl Into<String>,
        error: impl Into<String>,
        documents_retrieved: usize,
        documents_after_filter: usize,
        correction_attempts: u32,
    ) -> Self {
        let error = error.into();

        Self {
            question: question.into(),
            answer: format!("Error: {}", error),
            score: 0,
            score_justification: "Pipeline execution failed".to_string(),
            source_context: String::new(),
            documents_retrieved,
            documents_after_filter,
            correction_attempts,
            success: false,
            error_message: Some(error),
        }
    }

    fn empty_evidence(
        question: impl Into<String>,
        documents_retrieved: usize,
        justification: &str,
        error: &str,
    ) -> Self {
        Self {
            question: question.into(),
            answer: NO_INFORMATION_ANSWER.to_string(),
            score: 0,
            score_justification: justification.to_string(),
            source_context: String::new(),
            documents_retrieved,
            documents_after_filter: 0,
            correction_attempts: 0,
            success: false,
            error_message: Some(error.to_string()),
        }
    }
}
