//! Forwarding of one record to several sinks

use std::sync::Arc;

use tracing::warn;

use crate::domain::{DomainError, MetricsSink, QueryMetrics};

/// Sink that forwards every record to each inner sink.
///
/// A failing sink does not stop delivery to the remaining ones; failures are
/// reported together once every sink has been tried.
#[derive(Clone, Default)]
pub struct FanoutMetricsSink {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl std::fmt::Debug for FanoutMetricsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.sinks.iter().map(|s| s.sink_name()).collect();
        f.debug_struct("FanoutMetricsSink")
            .field("sinks", &names)
            .finish()
    }
}

impl FanoutMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl MetricsSink for FanoutMetricsSink {
    fn emit(&self, record: &QueryMetrics) -> Result<(), DomainError> {
        let mut failures = Vec::new();

        for sink in &self.sinks {
            if let Err(e) = sink.emit(record) {
                warn!(sink = sink.sink_name(), error = %e, "Metrics sink failed");
                failures.push(format!("{}: {}", sink.sink_name(), e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DomainError::storage(failures.join("; ")))
        }
    }

    fn sink_name(&self) -> &'static str {
        "fanout"
    }
}
