//! # Decision Log Sinks
//!
//! Every Is call hands exactly one [`DecisionLogRecord`] to the configured
//! [`DecisionLogger`] before it returns. A sink error fails the call, so a
//! computed decision is either logged or visibly rejected.
//!
//! Sinks are shared process-wide and invoked concurrently. Each call
//! receives an independent record; sinks serialize their own writes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use verdict_core::DecisionLogRecord;

/// Decision log sink failure.
#[derive(Debug, thiserror::Error)]
pub enum DecisionLogError {
    /// Writing the record failed.
    #[error("decision log I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The record could not be serialized.
    #[error("failed to serialize decision record: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The sink refused the record.
    #[error("decision log rejected record: {0}")]
    Rejected(String),
}

/// Destination for decision log records.
#[async_trait]
pub trait DecisionLogger: Send + Sync {
    /// Durably accept `record`, or fail.
    async fn log(&self, record: &DecisionLogRecord) -> Result<(), DecisionLogError>;
}

/// Emits each record as a structured `tracing` event on target `decision_log`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDecisionLogger;

#[async_trait]
impl DecisionLogger for TracingDecisionLogger {
    async fn log(&self, record: &DecisionLogRecord) -> Result<(), DecisionLogError> {
        let outcomes = serde_json::to_string(&record.outcomes)?;
        tracing::info!(
            target: "decision_log",
            id = %record.id,
            timestamp = %record.timestamp.to_rfc3339(),
            path = %record.path,
            policy_id = %record.policy.id,
            user_id = %record.user.id,
            user_email = %record.user.email,
            identity_type = %record.user.context.identity_type,
            outcomes = %outcomes,
            "decision"
        );
        Ok(())
    }
}

/// Bounded in-memory decision log.
///
/// When the log exceeds its capacity the oldest 10% of records are dropped.
#[derive(Debug)]
pub struct MemoryDecisionLog {
    records: Mutex<Vec<DecisionLogRecord>>,
    max_records: usize,
}

impl Default for MemoryDecisionLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl MemoryDecisionLog {
    /// A log retaining at most `max_records` records.
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            max_records: max_records.max(1),
        }
    }

    /// Snapshot of the retained records, oldest first.
    pub fn records(&self) -> Vec<DecisionLogRecord> {
        self.records.lock().clone()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no records are retained.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl DecisionLogger for MemoryDecisionLog {
    async fn log(&self, record: &DecisionLogRecord) -> Result<(), DecisionLogError> {
        let mut records = self.records.lock();
        records.push(record.clone());
        if records.len() > self.max_records {
            let trim_count = (self.max_records / 10).max(1);
            records.drain(..trim_count);
        }
        Ok(())
    }
}

/// Appends records as JSON lines to a file.
///
/// Writes are serialized through an async mutex so concurrent records never
/// interleave within a line.
#[derive(Debug)]
pub struct FileDecisionLogger {
    path: PathBuf,
    file: tokio::sync::Mutex<tokio::fs::File>,
}

impl FileDecisionLogger {
    /// Open (or create) `path` for appending.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DecisionLogError> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| DecisionLogError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DecisionLogger for FileDecisionLogger {
    async fn log(&self, record: &DecisionLogRecord) -> Result<(), DecisionLogError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let io_err = |source| DecisionLogError::Io {
            path: self.path.clone(),
            source,
        };
        let mut file = self.file.lock().await;
        file.write_all(&line).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        Ok(())
    }
}
