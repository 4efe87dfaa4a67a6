//! Relevance filtering of retrieved passages
//!
//! Each passage is checked against the question by a [`RelevanceClassifier`].
//! Checks may run concurrently; results are written into per-index slots so
//! the output order always matches the retrieval order. A failed check keeps
//! the passage (fail-open) and records the error as its justification.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::agents::RelevanceClassifier;
use super::deadline::with_deadline;
use super::types::RelevanceVerdict;
use crate::domain::retrieval::Passage;

/// Outcome of filtering a passage list
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Passages judged relevant, in retrieval order
    pub relevant: Vec<Passage>,
    /// Justification for each entry of `relevant`
    pub justifications: Vec<String>,
    /// One verdict per input passage, in input order
    pub verdicts: Vec<RelevanceVerdict>,
}

impl FilterOutcome {
    fn merge(passages: Vec<Passage>, verdicts: Vec<RelevanceVerdict>) -> Self {
        let mut relevant = Vec::new();
        let mut justifications = Vec::new();

        for (index, (passage, verdict)) in passages.into_iter().zip(verdicts.iter()).enumerate() {
            if verdict.is_relevant {
                debug!(document = index + 1, justification = %verdict.justification, "Passage is relevant");
                relevant.push(passage);
                justifications.push(verdict.justification.clone());
            } else {
                debug!(document = index + 1, justification = %verdict.justification, "Passage is irrelevant");
            }
        }

        Self {
            relevant,
            justifications,
            verdicts,
        }
    }

    /// Number of passages removed by the filter
    pub fn rejected(&self) -> usize {
        self.verdicts.len() - self.relevant.len()
    }
}

/// Guardrail stage that drops passages irrelevant to the question
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    classifier: Arc<dyn RelevanceClassifier>,
    call_timeout: Duration,
    max_concurrency: usize,
}

impl RelevanceFilter {
    pub fn new(
        classifier: Arc<dyn RelevanceClassifier>,
        call_timeout: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            classifier,
            call_timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Classify every passage and keep the relevant ones.
    ///
    /// With `parallel` set and more than one passage, up to `max_concurrency`
    /// checks are in flight at once.
    pub async fn filter(
        &self,
        question: &str,
        passages: Vec<Passage>,
        parallel: bool,
    ) -> FilterOutcome {
        if passages.is_empty() {
            return FilterOutcome::default();
        }

        let verdicts = if parallel && passages.len() > 1 {
            debug!(
                count = passages.len(),
                max_concurrency = self.max_concurrency,
                "Checking passages concurrently"
            );
            self.check_concurrently(question, &passages).await
        } else {
            self.check_sequentially(question, &passages).await
        };

        FilterOutcome::merge(passages, verdicts)
    }

    async fn check_sequentially(
        &self,
        question: &str,
        passages: &[Passage],
    ) -> Vec<RelevanceVerdict> {
        let mut verdicts = Vec::with_capacity(passages.len());

        for (index, passage) in passages.iter().enumerate() {
            debug!("Checking document {}/{}", index + 1, passages.len());
            verdicts.push(self.check(question, index, passage).await);
        }

        verdicts
    }

    async fn check_concurrently(
        &self,
        question: &str,
        passages: &[Passage],
    ) -> Vec<RelevanceVerdict> {
        let mut slots: Vec<Option<RelevanceVerdict>> = vec![None; passages.len()];

        let pending: Vec<_> = passages
            .iter()
            .enumerate()
            .map(|(index, passage)| async move {
                (index, self.check(question, index, passage).await)
            })
            .collect();
        let mut checks = stream::iter(pending).buffer_unordered(self.max_concurrency);

        while let Some((index, verdict)) = checks.next().await {
            slots[index] = Some(verdict);
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| RelevanceVerdict::relevant("No verdict recorded"))
            })
            .collect()
    }

    async fn check(&self, question: &str, index: usize, passage: &Passage) -> RelevanceVerdict {
        let result = with_deadline(
            "Relevance check",
            self.call_timeout,
            self.classifier.classify(question, &passage.text),
        )
        .await;

        match result {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(
                    document = index + 1,
                    error = %e,
                    "Relevance check failed, including passage by default"
                );
                RelevanceVerdict::fail_open(&e)
            }
        }
    }
}
