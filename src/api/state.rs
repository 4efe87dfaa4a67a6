//! Application state shared by request handlers

use std::sync::Arc;

use crate::infrastructure::metrics::MetricsCollector;
use crate::infrastructure::rag::RagPipeline;

/// Long-lived components; cloning shares them
#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub collector: Arc<MetricsCollector>,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>, collector: Arc<MetricsCollector>) -> Self {
        Self {
            pipeline,
            collector,
        }
    }
}
