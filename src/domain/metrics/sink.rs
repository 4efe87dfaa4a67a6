//! Metrics sink contract

use super::QueryMetrics;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Destination for finalized query metrics.
///
/// Emission is fire-and-forget from the pipeline's point of view: an error
/// returned here is logged by the caller and never fails the query.
#[cfg_attr(test, automock)]
pub trait MetricsSink: Send + Sync {
    fn emit(&self, record: &QueryMetrics) -> Result<(), DomainError>;

    fn sink_name(&self) -> &'static str;
}

/// Sink that drops every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn emit(&self, _record: &QueryMetrics) -> Result<(), DomainError> {
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "noop"
    }
}
