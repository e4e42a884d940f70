//! Storage traits and error types

use crate::storage::{HistoryEntry, HistoryRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Audit log of finished crawls
///
/// Receives one entry per crawl, whatever its outcome.
pub trait HistoryStore {
    /// Appends an entry
    ///
    /// # Returns
    ///
    /// The ID of the new row
    fn record(&mut self, entry: &HistoryEntry) -> StorageResult<i64>;

    /// Most recent entries first
    fn recent(&self, limit: usize) -> StorageResult<Vec<HistoryRecord>>;

    /// Total number of entries
    fn count(&self) -> StorageResult<u64>;
}
