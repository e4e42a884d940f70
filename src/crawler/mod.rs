//! Crawler module for bounded site crawls
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with body caps and error classification
//! - HTML parsing into text, links and images
//! - The breadth-first crawl controller and its budgets
//! - Per-session crawl execution and cancellation

mod controller;
mod fetcher;
mod parser;
mod request;
mod service;

pub use controller::CrawlController;
pub use fetcher::{build_http_client, FetchError, FetchedPage, HttpFetcher, PageFetcher, MAX_REDIRECTS};
pub use parser::{ContentExtractor, ExtractedImage, ExtractedLink, ExtractedPage, HtmlExtractor};
pub use request::CrawlRequest;
pub use service::{CrawlHandle, CrawlService};
