//! Storage module for the scrape history
//!
//! Every finished crawl leaves one audit row: the seed URL, the site title,
//! when it ran, whether it succeeded and why not, plus the terminal status
//! and the hash of the configuration that drove it.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteHistory;
pub use traits::{HistoryStore, StorageError, StorageResult};

use crate::output::CrawlResult;
use crate::state::CrawlStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Message stored when a crawl fetched nothing and carried no diagnostic
const NO_PAGES_MESSAGE: &str = "No pages could be fetched";

/// Opens (or creates) a history database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteHistory)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to open the database
pub fn open_history(path: &Path) -> StorageResult<SqliteHistory> {
    SqliteHistory::new(path)
}

/// One finished crawl, as handed to the history store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    pub scraped_at: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
    pub status: CrawlStatus,
    pub pages_fetched: usize,
    pub truncated: bool,
    pub config_hash: String,
}

impl HistoryEntry {
    /// Builds the audit entry for a crawl result
    pub fn from_result(result: &CrawlResult, config_hash: &str) -> Self {
        let success = result.succeeded();

        let error_message = if success {
            None
        } else {
            Some(
                result
                    .message
                    .clone()
                    .or_else(|| result.errors.first().map(|e| e.message.clone()))
                    .unwrap_or_else(|| NO_PAGES_MESSAGE.to_string()),
            )
        };

        Self {
            url: result.seed_url.clone(),
            title: result.site_title().to_string(),
            scraped_at: Utc::now(),
            success,
            error_message,
            status: result.status,
            pages_fetched: result.pages.len(),
            truncated: result.truncated,
            config_hash: config_hash.to_string(),
        }
    }
}

/// A stored history row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub id: i64,
    #[serde(flatten)]
    pub entry: HistoryEntry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{PageContent, PageError, PageErrorKind, FALLBACK_TITLE};
    use std::time::Duration;

    fn create_test_result(status: CrawlStatus, with_page: bool) -> CrawlResult {
        let mut result = CrawlResult::failed("https://example.com/", "x", Duration::ZERO);
        result.status = status;
        result.message = None;
        if with_page {
            result.pages.push(PageContent {
                url: "https://example.com/".to_string(),
                depth: 0,
                title: Some("Example".to_string()),
                text: String::new(),
            });
        }
        result
    }

    #[test]
    fn test_entry_for_successful_crawl() {
        let entry = HistoryEntry::from_result(&create_test_result(CrawlStatus::Completed, true), "abc");
        assert!(entry.success);
        assert_eq!(entry.title, "Example");
        assert_eq!(entry.pages_fetched, 1);
        assert!(entry.error_message.is_none());
        assert_eq!(entry.config_hash, "abc");
    }

    #[test]
    fn test_timed_out_crawl_with_pages_is_success() {
        let entry = HistoryEntry::from_result(&create_test_result(CrawlStatus::TimedOut, true), "");
        assert!(entry.success);
        assert_eq!(entry.status, CrawlStatus::TimedOut);
    }

    #[test]
    fn test_entry_uses_first_page_error() {
        let mut result = create_test_result(CrawlStatus::Completed, false);
        result.errors.push(PageError {
            url: "https://example.com/".to_string(),
            kind: PageErrorKind::ConnectionError,
            status_code: None,
            message: "connection refused".to_string(),
        });

        let entry = HistoryEntry::from_result(&result, "");
        assert!(!entry.success);
        assert_eq!(entry.title, FALLBACK_TITLE);
        assert_eq!(entry.error_message.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_entry_without_any_diagnostic() {
        let entry = HistoryEntry::from_result(&create_test_result(CrawlStatus::Completed, false), "");
        assert_eq!(entry.error_message.as_deref(), Some(NO_PAGES_MESSAGE));
    }
}
