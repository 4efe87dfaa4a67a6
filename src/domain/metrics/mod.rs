//! Query metrics domain
//!
//! Per-query measurement records, the sink contract they are emitted to and
//! aggregation across recorded queries.

mod aggregate;
mod record;
mod sink;

pub use aggregate::AggregateMetrics;
pub use record::{elapsed_ms, QueryMetrics};
pub use sink::{MetricsSink, NoopMetricsSink};

#[cfg(test)]
pub use sink::MockMetricsSink;
