//! Output module for crawl results
//!
//! This module handles:
//! - The record types a crawl produces (`CrawlResult` and friends)
//! - Deduplicating, capped aggregation of links and images
//! - Rendering results as a markdown report

mod aggregator;
mod markdown;
mod types;

pub use aggregator::{AggregateSnapshot, Admission, ResultAggregator};
pub use markdown::{format_markdown_report, write_markdown_report};
pub use types::{
    CrawlResult, ImageRecord, LinkRecord, PageContent, PageError, PageErrorKind, FALLBACK_TITLE,
};
