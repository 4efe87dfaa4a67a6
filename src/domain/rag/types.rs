//! Verdicts, evaluations and attempts produced while answering a question

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Lowest score on the groundedness scale
pub const MIN_SCORE: u8 = 1;
/// Highest score on the groundedness scale
pub const MAX_SCORE: u8 = 5;

/// Relevance decision for one passage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    pub is_relevant: bool,
    pub justification: String,
}

impl RelevanceVerdict {
    pub fn relevant(justification: impl Into<String>) -> Self {
        Self {
            is_relevant: true,
            justification: justification.into(),
        }
    }

    pub fn irrelevant(justification: impl Into<String>) -> Self {
        Self {
            is_relevant: false,
            justification: justification.into(),
        }
    }

    /// Verdict used when the classifier call itself failed: keep the passage
    pub fn fail_open(error: &DomainError) -> Self {
        Self::relevant(format!("Error during check: {}", error))
    }
}

/// Groundedness score for an answer, always within [1, 5]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    score: u8,
    justification: String,
}

impl Evaluation {
    /// Build an evaluation, rejecting scores outside the 1-5 scale
    pub fn new(score: i64, justification: impl Into<String>) -> Result<Self, DomainError> {
        if score < MIN_SCORE as i64 || score > MAX_SCORE as i64 {
            return Err(DomainError::invalid_evaluation(format!(
                "score {} is outside the {}-{} range",
                score, MIN_SCORE, MAX_SCORE
            )));
        }

        Ok(Self {
            score: score as u8,
            justification: justification.into(),
        })
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn justification(&self) -> &str {
        &self.justification
    }
}

/// Output of one generate+score iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub answer: String,
    pub evaluation: Evaluation,
    /// 1-based iteration number
    pub attempt_number: u32,
}

impl Attempt {
    pub fn new(answer: impl Into<String>, evaluation: Evaluation, attempt_number: u32) -> Self {
        Self {
            answer: answer.into(),
            evaluation,
            attempt_number,
        }
    }

    pub fn score(&self) -> u8 {
        self.evaluation.score()
    }
}
