//! Aggregation over recorded queries

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::QueryMetrics;

/// Summary statistics across a set of query records.
///
/// Latency, score, attempt and rejection figures are computed over
/// successful queries only; the rejection rate additionally skips queries
/// that retrieved nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub total_queries: u64,
    pub successful_queries: u64,
    pub failed_queries: u64,

    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,

    pub avg_score: f64,
    /// Score -> number of successful queries with that score
    pub score_distribution: BTreeMap<u8, u64>,

    pub avg_correction_attempts: f64,
    pub avg_filter_rejection_rate: f64,
}

impl AggregateMetrics {
    pub fn from_records(records: &[QueryMetrics]) -> Self {
        let mut aggregate = Self {
            total_queries: records.len() as u64,
            ..Self::default()
        };

        let successful: Vec<&QueryMetrics> = records.iter().filter(|m| m.success).collect();
        aggregate.successful_queries = successful.len() as u64;
        aggregate.failed_queries = aggregate.total_queries - aggregate.successful_queries;

        if successful.is_empty() {
            return aggregate;
        }

        let count = successful.len() as f64;

        let latencies = successful.iter().map(|m| m.total_latency_ms);
        aggregate.avg_latency_ms = latencies.clone().sum::<f64>() / count;
        aggregate.min_latency_ms = latencies.clone().fold(f64::INFINITY, f64::min);
        aggregate.max_latency_ms = latencies.fold(0.0, f64::max);

        aggregate.avg_score =
            successful.iter().map(|m| m.final_score as f64).sum::<f64>() / count;
        for m in &successful {
            *aggregate.score_distribution.entry(m.final_score).or_insert(0) += 1;
        }

        aggregate.avg_correction_attempts = successful
            .iter()
            .map(|m| m.correction_attempts as f64)
            .sum::<f64>()
            / count;

        let rejection_rates: Vec<f64> = successful
            .iter()
            .filter(|m| m.documents_retrieved > 0)
            .map(|m| m.filter_rejection_rate)
            .collect();
        if !rejection_rates.is_empty() {
            aggregate.avg_filter_rejection_rate =
                rejection_rates.iter().sum::<f64>() / rejection_rates.len() as f64;
        }

        aggregate
    }

    /// Fraction of queries that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.total_queries == 0 {
            return 0.0;
        }
        self.successful_queries as f64 / self.total_queries as f64
    }

    /// Human-readable report
    pub fn summary(&self) -> String {
        if self.total_queries == 0 {
            return "No metrics to display".to_string();
        }

        let rule = "=".repeat(60);
        let distribution = self
            .score_distribution
            .iter()
            .map(|(score, n)| format!("{}: {}", score, n))
            .collect::<Vec<_>>()
            .join(", ");

        let mut out = String::new();
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "METRICS SUMMARY");
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Total Queries: {}", self.total_queries);
        let _ = writeln!(out, "Successful: {}", self.successful_queries);
        let _ = writeln!(out, "Failed: {}", self.failed_queries);
        let _ = writeln!(out, "Success Rate: {:.1}%", self.success_rate() * 100.0);
        let _ = writeln!(out);
        let _ = writeln!(out, "Performance:");
        let _ = writeln!(out, "  Avg Latency: {:.0}ms", self.avg_latency_ms);
        let _ = writeln!(out, "  Min Latency: {:.0}ms", self.min_latency_ms);
        let _ = writeln!(out, "  Max Latency: {:.0}ms", self.max_latency_ms);
        let _ = writeln!(out);
        let _ = writeln!(out, "Quality:");
        let _ = writeln!(out, "  Avg Score: {:.2}/5", self.avg_score);
        let _ = writeln!(out, "  Score Distribution: {{{}}}", distribution);
        let _ = writeln!(
            out,
            "  Avg Correction Attempts: {:.2}",
            self.avg_correction_attempts
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Filtering:");
        let _ = writeln!(
            out,
            "  Avg Rejection Rate: {:.1}%",
            self.avg_filter_rejection_rate * 100.0
        );
        let _ = write!(out, "{}", rule);

        out
    }
}
