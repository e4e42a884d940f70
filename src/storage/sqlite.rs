//! SQLite history store
//!
//! This module provides a SQLite-based implementation of the HistoryStore trait.

use crate::state::CrawlStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{HistoryStore, StorageError, StorageResult};
use crate::storage::{HistoryEntry, HistoryRecord};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Error::FromSqlConversionFailure;
use rusqlite::{params, Connection, Row};
use std::path::Path;

/// SQLite history backend
pub struct SqliteHistory {
    conn: Connection,
}

impl SqliteHistory {
    /// Creates a new SqliteHistory instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteHistory)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Maps a `scrape_history` row
fn read_row(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    let scraped_at: String = row.get(3)?;
    let scraped_at = DateTime::parse_from_rfc3339(&scraped_at)
        .map_err(|e| FromSqlConversionFailure(3, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    let status: String = row.get(6)?;
    let status = CrawlStatus::from_db_string(&status).ok_or_else(|| {
        FromSqlConversionFailure(
            6,
            Type::Text,
            Box::new(StorageError::Serialization(format!(
                "unknown crawl status '{}'",
                status
            ))),
        )
    })?;

    let pages_fetched: i64 = row.get(7)?;

    Ok(HistoryRecord {
        id: row.get(0)?,
        entry: HistoryEntry {
            url: row.get(1)?,
            title: row.get(2)?,
            scraped_at,
            success: row.get(4)?,
            error_message: row.get(5)?,
            status,
            pages_fetched: pages_fetched.max(0) as usize,
            truncated: row.get(8)?,
            config_hash: row.get(9)?,
        },
    })
}

impl HistoryStore for SqliteHistory {
    fn record(&mut self, entry: &HistoryEntry) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO scrape_history
                (url, title, scraped_at, success, error_message, status, pages_fetched, truncated, config_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.url,
                entry.title,
                entry.scraped_at.to_rfc3339(),
                entry.success,
                entry.error_message,
                entry.status.to_db_string(),
                entry.pages_fetched as i64,
                entry.truncated,
                entry.config_hash,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn recent(&self, limit: usize) -> StorageResult<Vec<HistoryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, title, scraped_at, success, error_message, status, pages_fetched, truncated, config_hash
             FROM scrape_history
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let records = stmt
            .query_map(params![limit as i64], read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scrape_history", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}
