//! Self-correction loop
//!
//! Generates an answer, scores it, and regenerates while the score stays
//! below the accept threshold. The loop stops on the first acceptable
//! attempt; when every attempt falls short it returns the best one seen,
//! preferring the earliest attempt among equal scores. Generator or scorer
//! failures abort the loop instead of counting as a low-quality attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::agents::{AnswerGenerator, AnswerScorer};
use super::deadline::with_deadline;
use super::types::{Attempt, Evaluation};
use crate::domain::metrics::{elapsed_ms, QueryMetrics};
use crate::domain::DomainError;

/// What the controller does after scoring an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Score meets the threshold: stop and return this attempt
    Accept,
    /// Below threshold with attempts left: generate again
    Retry,
    /// Below threshold on the final attempt: return the best attempt
    Exhausted,
}

impl Decision {
    pub fn after(score: u8, min_acceptable_score: u8, attempt_number: u32, max_attempts: u32) -> Self {
        if score >= min_acceptable_score {
            Self::Accept
        } else if attempt_number < max_attempts {
            Self::Retry
        } else {
            Self::Exhausted
        }
    }
}

/// Keeps the best-scoring attempt and the most recent one
#[derive(Debug, Default)]
pub struct AttemptTracker {
    best: Option<Attempt>,
    latest: Option<Attempt>,
}

impl AttemptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt; returns `true` when it became the new best.
    ///
    /// Only a strictly higher score replaces the current best.
    pub fn record(&mut self, attempt: Attempt) -> bool {
        let improved = match &self.best {
            Some(best) => attempt.score() > best.score(),
            None => true,
        };

        if improved {
            self.best = Some(attempt.clone());
        }
        self.latest = Some(attempt);

        improved
    }

    pub fn best(&self) -> Option<&Attempt> {
        self.best.as_ref()
    }

    pub fn latest(&self) -> Option<&Attempt> {
        self.latest.as_ref()
    }

    /// Best attempt, falling back to the latest one
    pub fn into_best(self) -> Option<Attempt> {
        self.best.or(self.latest)
    }
}

/// Runs the bounded generate/score loop
#[derive(Debug, Clone)]
pub struct CorrectionController {
    generator: Arc<dyn AnswerGenerator>,
    scorer: Arc<dyn AnswerScorer>,
    call_timeout: Duration,
}

impl CorrectionController {
    pub fn new(
        generator: Arc<dyn AnswerGenerator>,
        scorer: Arc<dyn AnswerScorer>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            generator,
            scorer,
            call_timeout,
        }
    }

    /// Run up to `max_attempts` iterations and return the chosen attempt.
    ///
    /// Generation and evaluation latencies, plus the number of completed
    /// attempts, are accumulated into `metrics` as the loop runs.
    pub async fn run(
        &self,
        question: &str,
        context: &str,
        max_attempts: u32,
        min_acceptable_score: u8,
        metrics: &mut QueryMetrics,
    ) -> Result<Attempt, DomainError> {
        let max_attempts = max_attempts.max(1);
        let mut tracker = AttemptTracker::new();

        for attempt_number in 1..=max_attempts {
            info!(attempt = attempt_number, max_attempts, "Correction attempt");

            let answer = self.generate(question, context, metrics).await?;
            let evaluation = self.evaluate(&answer, context, metrics).await?;
            metrics.correction_attempts = attempt_number;

            let attempt = Attempt::new(answer, evaluation, attempt_number);
            let score = attempt.score();
            info!(
                attempt = attempt_number,
                score,
                justification = %attempt.evaluation.justification(),
                "Answer evaluated"
            );

            match Decision::after(score, min_acceptable_score, attempt_number, max_attempts) {
                Decision::Accept => {
                    info!(
                        score,
                        min_acceptable_score,
                        attempt = attempt_number,
                        "Acceptable score achieved"
                    );
                    return Ok(attempt);
                }
                Decision::Retry => {
                    warn!(
                        score,
                        min_acceptable_score,
                        next_attempt = attempt_number + 1,
                        max_attempts,
                        "Score below threshold, retrying"
                    );
                    tracker.record(attempt);
                }
                Decision::Exhausted => {
                    tracker.record(attempt);
                }
            }
        }

        let best_score = tracker.best().map(|a| a.score()).unwrap_or_default();
        warn!(
            best_score,
            min_acceptable_score, "Max correction attempts reached, returning best attempt"
        );

        tracker
            .into_best()
            .ok_or_else(|| DomainError::internal("Correction loop produced no attempts"))
    }

    async fn generate(
        &self,
        question: &str,
        context: &str,
        metrics: &mut QueryMetrics,
    ) -> Result<String, DomainError> {
        let started = Instant::now();
        let result = with_deadline(
            "Answer generation",
            self.call_timeout,
            self.generator.generate(question, context),
        )
        .await;
        metrics.generation_latency_ms += elapsed_ms(started);

        let answer = result?;
        debug!(chars = answer.chars().count(), "Generated answer");
        Ok(answer)
    }

    async fn evaluate(
        &self,
        answer: &str,
        context: &str,
        metrics: &mut QueryMetrics,
    ) -> Result<Evaluation, DomainError> {
        let started = Instant::now();
        let result = with_deadline(
            "Answer evaluation",
            self.call_timeout,
            self.scorer.score(answer, context),
        )
        .await;
        metrics.evaluation_latency_ms += elapsed_ms(started);

        result
    }
}
