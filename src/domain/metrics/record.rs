//! Per-query metrics record

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds elapsed since `started`
pub fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Measurements for one pipeline run.
///
/// Created when the query starts, filled in by the stage that owns each
/// field and emitted once when the run ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub query_id: String,
    pub timestamp: DateTime<Utc>,
    pub question: String,

    #[serde(default)]
    pub total_latency_ms: f64,
    #[serde(default)]
    pub retrieval_latency_ms: f64,
    #[serde(default)]
    pub guardrail_latency_ms: f64,
    /// Summed across correction attempts
    #[serde(default)]
    pub generation_latency_ms: f64,
    /// Summed across correction attempts
    #[serde(default)]
    pub evaluation_latency_ms: f64,

    #[serde(default)]
    pub documents_retrieved: usize,
    #[serde(default)]
    pub documents_after_filter: usize,
    /// Fraction of retrieved passages removed by the relevance filter
    #[serde(default)]
    pub filter_rejection_rate: f64,

    #[serde(default)]
    pub final_score: u8,
    #[serde(default)]
    pub correction_attempts: u32,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl QueryMetrics {
    pub fn new(query_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            timestamp: Utc::now(),
            question: question.into(),
            total_latency_ms: 0.0,
            retrieval_latency_ms: 0.0,
            guardrail_latency_ms: 0.0,
            generation_latency_ms: 0.0,
            evaluation_latency_ms: 0.0,
            documents_retrieved: 0,
            documents_after_filter: 0,
            filter_rejection_rate: 0.0,
            final_score: 0,
            correction_attempts: 0,
            success: false,
            error_message: None,
        }
    }

    /// Record passage counts and derive the rejection rate
    pub fn set_document_counts(&mut self, retrieved: usize, after_filter: usize) {
        self.documents_retrieved = retrieved;
        self.documents_after_filter = after_filter;
        self.filter_rejection_rate = if retrieved > 0 {
            1.0 - (after_filter as f64 / retrieved as f64)
        } else {
            0.0
        };
    }

    /// Sum of the per-stage latencies
    pub fn stage_latency_ms(&self) -> f64 {
        self.retrieval_latency_ms
            + self.guardrail_latency_ms
            + self.generation_latency_ms
            + self.evaluation_latency_ms
    }
}
