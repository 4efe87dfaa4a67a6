//! Query metrics sinks

mod collector;
mod fanout;

pub use collector::{MetricsCollector, MetricsFile, DEFAULT_MAX_RECORDS};
pub use fanout::FanoutMetricsSink;
