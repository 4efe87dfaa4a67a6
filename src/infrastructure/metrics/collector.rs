//! In-memory query metrics with optional JSON file persistence

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::domain::{AggregateMetrics, DomainError, MetricsSink, QueryMetrics};

/// On-disk layout of the metrics file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsFile {
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub queries: Vec<QueryMetrics>,
}

impl MetricsFile {
    /// Read a metrics file written by [`MetricsCollector`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            DomainError::storage(format!("Failed to read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&raw).map_err(|e| {
            DomainError::storage(format!("Invalid metrics file {}: {}", path.display(), e))
        })
    }
}

/// Records kept in memory before the oldest are dropped
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// Thread-safe collector of finished query records.
///
/// The in-memory history is capped at `max_records`, oldest first out. When a
/// file path is configured the history is rewritten after every emitted
/// record. Inside a tokio runtime the write runs on the blocking pool and never
/// holds the record lock; outside one it runs inline.
#[derive(Debug)]
pub struct MetricsCollector {
    enabled: bool,
    metrics_file: Option<PathBuf>,
    max_records: usize,
    records: Arc<RwLock<Vec<QueryMetrics>>>,
    file_lock: Arc<Mutex<()>>,
}

impl MetricsCollector {
    pub fn new(enabled: bool, metrics_file: Option<PathBuf>) -> Self {
        if enabled {
            match &metrics_file {
                Some(path) => info!("Metrics collector initialized: {}", path.display()),
                None => info!("Metrics collector initialized (in memory)"),
            }
        }

        Self {
            enabled,
            metrics_file,
            max_records: DEFAULT_MAX_RECORDS,
            records: Arc::new(RwLock::new(Vec::new())),
            file_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Collector that keeps records in memory only
    pub fn in_memory() -> Self {
        Self::new(true, None)
    }

    /// Cap the in-memory history, floored at one record
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    pub fn records(&self) -> Result<Vec<QueryMetrics>, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(records.clone())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn aggregate(&self) -> Result<AggregateMetrics, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(AggregateMetrics::from_records(&records))
    }

    pub fn clear(&self) -> Result<(), DomainError> {
        let mut records = self.records.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        records.clear();
        info!("Metrics cleared");
        Ok(())
    }

    /// Write the current history and wait for it to land on disk
    pub async fn flush(&self) -> Result<(), DomainError> {
        let Some(path) = self.metrics_file.clone() else {
            return Ok(());
        };
        if !self.enabled || self.is_empty() {
            return Ok(());
        }

        let records = Arc::clone(&self.records);
        let file_lock = Arc::clone(&self.file_lock);

        tokio::task::spawn_blocking(move || persist(&path, &records, &file_lock))
            .await
            .map_err(|e| DomainError::storage(format!("Metrics writer failed: {}", e)))?
    }

    fn push(&self, record: &QueryMetrics) -> Result<(), DomainError> {
        let mut records = self.records.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        records.push(record.clone());
        if records.len() > self.max_records {
            let excess = records.len() - self.max_records;
            records.drain(..excess);
        }

        Ok(())
    }
}

/// Snapshot the history and rewrite `path` with it.
///
/// `file_lock` orders concurrent writers; each takes its snapshot after
/// acquiring it, so the file never goes back to an older history.
fn persist(
    path: &Path,
    records: &RwLock<Vec<QueryMetrics>>,
    file_lock: &Mutex<()>,
) -> Result<(), DomainError> {
    let _writing = file_lock
        .lock()
        .map_err(|e| DomainError::storage(format!("Failed to acquire file lock: {}", e)))?;

    let queries = records
        .read()
        .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))?
        .clone();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            DomainError::storage(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    let document = MetricsFile {
        last_updated: Utc::now(),
        queries,
    };
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| DomainError::storage(format!("Failed to encode metrics: {}", e)))?;

    fs::write(path, json).map_err(|e| {
        DomainError::storage(format!("Error saving metrics to {}: {}", path.display(), e))
    })
}

impl MetricsSink for MetricsCollector {
    fn emit(&self, record: &QueryMetrics) -> Result<(), DomainError> {
        if !self.enabled {
            return Ok(());
        }

        self.push(record)?;
        debug!(query_id = %record.query_id, "Recorded query metrics");

        let Some(path) = &self.metrics_file else {
            return Ok(());
        };

        match Handle::try_current() {
            Ok(handle) => {
                let path = path.clone();
                let records = Arc::clone(&self.records);
                let file_lock = Arc::clone(&self.file_lock);

                handle.spawn_blocking(move || {
                    if let Err(e) = persist(&path, &records, &file_lock) {
                        warn!(error = %e, "Failed to persist query metrics");
                    }
                });
                Ok(())
            }
            Err(_) => persist(path, &self.records, &self.file_lock),
        }
    }

    fn sink_name(&self) -> &'static str {
        "collector"
    }
}
