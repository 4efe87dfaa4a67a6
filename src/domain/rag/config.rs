//! Self-correcting pipeline configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Options consumed by the answer pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    /// Retry ceiling for generate/score iterations (>= 1)
    #[serde(default = "default_max_correction_attempts")]
    pub max_correction_attempts: u32,
    /// Accept threshold on the 1-5 groundedness scale
    #[serde(default = "default_min_acceptable_score")]
    pub min_acceptable_score: u8,
    /// Whether relevance filtering runs at all
    #[serde(default = "default_true")]
    pub guardrail_enabled: bool,
    /// Concurrent vs sequential relevance checks
    #[serde(default = "default_true")]
    pub parallel_guardrail_checks: bool,
    /// Upper bound on in-flight relevance checks when running concurrently
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,
    /// Context truncation bound, in characters
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
    /// Question length bound, in characters
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
    /// Strip control characters and collapse whitespace in questions
    #[serde(default = "default_true")]
    pub enable_sanitization: bool,
    /// Timeout applied to every retriever and model call
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

fn default_max_correction_attempts() -> u32 {
    3
}

fn default_min_acceptable_score() -> u8 {
    3
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_checks() -> usize {
    8
}

fn default_max_context_length() -> usize {
    8000
}

fn default_max_query_length() -> usize {
    1000
}

fn default_call_timeout_secs() -> u64 {
    60
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_correction_attempts: default_max_correction_attempts(),
            min_acceptable_score: default_min_acceptable_score(),
            guardrail_enabled: default_true(),
            parallel_guardrail_checks: default_true(),
            max_concurrent_checks: default_max_concurrent_checks(),
            max_context_length: default_max_context_length(),
            max_query_length: default_max_query_length(),
            enable_sanitization: default_true(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl RagConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_correction_attempts(mut self, attempts: u32) -> Self {
        self.max_correction_attempts = attempts;
        self
    }

    pub fn with_min_acceptable_score(mut self, score: u8) -> Self {
        self.min_acceptable_score = score;
        self
    }

    pub fn with_guardrail(mut self, enabled: bool) -> Self {
        self.guardrail_enabled = enabled;
        self
    }

    pub fn with_parallel_checks(mut self, parallel: bool) -> Self {
        self.parallel_guardrail_checks = parallel;
        self
    }

    pub fn with_max_concurrent_checks(mut self, max: usize) -> Self {
        self.max_concurrent_checks = max;
        self
    }

    pub fn with_max_context_length(mut self, max: usize) -> Self {
        self.max_context_length = max;
        self
    }

    pub fn with_max_query_length(mut self, max: usize) -> Self {
        self.max_query_length = max;
        self
    }

    pub fn with_call_timeout_secs(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Check every option against its allowed range
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_correction_attempts < 1 {
            return Err(DomainError::configuration(
                "max_correction_attempts must be at least 1",
            ));
        }

        if !(1..=5).contains(&self.min_acceptable_score) {
            return Err(DomainError::configuration(format!(
                "min_acceptable_score must be between 1 and 5, got {}",
                self.min_acceptable_score
            )));
        }

        if self.max_context_length == 0 {
            return Err(DomainError::configuration(
                "max_context_length must be greater than 0",
            ));
        }

        if self.max_query_length == 0 {
            return Err(DomainError::configuration(
                "max_query_length must be greater than 0",
            ));
        }

        if self.max_concurrent_checks == 0 {
            return Err(DomainError::configuration(
                "max_concurrent_checks must be at least 1",
            ));
        }

        if self.call_timeout_secs == 0 {
            return Err(DomainError::configuration(
                "call_timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }
}
