//! Crawl result types
//!
//! These are the records handed to export and persistence layers once a
//! crawl ends (or snapshotted while it runs).

use crate::state::CrawlStatus;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Title used when the first page has none
pub const FALLBACK_TITLE: &str = "Website Content";

/// A hyperlink found on a fetched page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Normalized target URL
    pub url: String,

    /// Page the link was found on
    pub source_page: String,

    /// Visible anchor text (or a fallback derived from the URL)
    pub anchor_text: String,

    /// True if the target is on a different site than the seed
    pub external: bool,
}

/// An image found on a fetched page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub url: String,
    pub alt_text: String,
    pub source_page: String,
}

/// Extracted content of one fetched page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    pub depth: u32,
    pub title: Option<String>,
    pub text: String,
}

/// Category of a per-page failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageErrorKind {
    Timeout,
    ConnectionError,
    HttpStatus,
    ContentTooLarge,
    UnsupportedContent,
    OffSiteRedirect,
    Other,
}

impl PageErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionError => "connection_error",
            Self::HttpStatus => "http_status",
            Self::ContentTooLarge => "content_too_large",
            Self::UnsupportedContent => "unsupported_content",
            Self::OffSiteRedirect => "off_site_redirect",
            Self::Other => "other",
        }
    }
}

/// A page that could not be fetched or processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageError {
    pub url: String,
    pub kind: PageErrorKind,
    /// HTTP status for `HttpStatus` failures
    pub status_code: Option<u16>,
    pub message: String,
}

/// Everything a crawl produced
///
/// Always returned, whatever the terminal status: timeouts, aborts and
/// controller faults carry whatever was collected up to that point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub seed_url: String,
    pub status: CrawlStatus,
    pub pages: Vec<PageContent>,
    pub links: Vec<LinkRecord>,
    pub images: Vec<ImageRecord>,
    pub errors: Vec<PageError>,

    /// True if the crawl stopped on a budget rather than frontier exhaustion
    pub truncated: bool,

    pub elapsed: Duration,

    /// Diagnostic for `Failed` results, or a note for other terminal states
    pub message: Option<String>,
}

impl CrawlResult {
    /// Result for a crawl that died before producing anything
    pub fn failed(seed_url: &str, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            seed_url: seed_url.to_string(),
            status: CrawlStatus::Failed,
            pages: Vec::new(),
            links: Vec::new(),
            images: Vec::new(),
            errors: Vec::new(),
            truncated: true,
            elapsed,
            message: Some(message.into()),
        }
    }

    /// Title of the first fetched page, or a generic fallback
    pub fn site_title(&self) -> &str {
        self.pages
            .first()
            .and_then(|p| p.title.as_deref())
            .filter(|t| !t.is_empty())
            .unwrap_or(FALLBACK_TITLE)
    }

    /// True if at least one page was fetched and the crawl did not fault
    pub fn succeeded(&self) -> bool {
        !self.pages.is_empty() && self.status != CrawlStatus::Failed
    }

    /// True if exports should label this result as incomplete
    pub fn is_partial(&self) -> bool {
        self.truncated || self.status != CrawlStatus::Completed
    }

    /// Extracted text of a fetched page
    pub fn page_text(&self, url: &str) -> Option<&str> {
        self.pages
            .iter()
            .find(|p| p.url == url)
            .map(|p| p.text.as_str())
    }

    pub fn external_link_count(&self) -> usize {
        self.links.iter().filter(|l| l.external).count()
    }
}
