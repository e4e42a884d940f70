//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent string
//! - Single bounded GET requests with a per-request timeout
//! - Redirect following (the final URL is reported back)
//! - Body size capping
//! - Error classification
//!
//! There are no retries at this layer; the controller owns the retry policy.

use crate::config::{Config, UserAgentConfig};
use crate::output::{PageError, PageErrorKind};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client, Response};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Longest redirect chain the client follows
pub const MAX_REDIRECTS: usize = 10;

/// Connection establishment timeout, independent of the per-page timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value (empty if absent)
    pub content_type: String,
    /// Page body, decoded lossily as UTF-8
    pub body: String,
    /// True if the body was cut at the size cap
    pub truncated: bool,
}

/// Why a single fetch failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("Response body of {size} bytes exceeds the {max} byte cap")]
    ContentTooLarge { size: u64, max: usize },

    #[error("Unsupported content type: {0}")]
    UnsupportedContent(String),

    #[error("Fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    pub fn kind(&self) -> PageErrorKind {
        match self {
            Self::Timeout(_) => PageErrorKind::Timeout,
            Self::Connection(_) => PageErrorKind::ConnectionError,
            Self::HttpStatus(_) => PageErrorKind::HttpStatus,
            Self::ContentTooLarge { .. } => PageErrorKind::ContentTooLarge,
            Self::UnsupportedContent(_) => PageErrorKind::UnsupportedContent,
            Self::Other(_) => PageErrorKind::Other,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }

    /// Returns true for failures worth retrying: timeouts, connection errors and 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::HttpStatus(code) => (500..600).contains(code),
            _ => false,
        }
    }

    /// Converts the failure into the record stored in a crawl result
    pub fn to_page_error(&self, url: &Url) -> PageError {
        PageError {
            url: url.to_string(),
            kind: self.kind(),
            status_code: self.status_code(),
            message: self.to_string(),
        }
    }
}

/// A source of pages
///
/// The controller only talks to this trait, so tests (and alternative
/// transports) can stand in for the HTTP client.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one URL, giving up after `timeout`
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_scrape::config::UserAgentConfig;
/// use sumi_scrape::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.value.as_str())
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed page fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(client: Client, max_body_bytes: usize) -> Self {
        Self {
            client,
            max_body_bytes,
        }
    }

    /// Builds a fetcher from the user agent and body cap settings
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent)?;
        Ok(Self::new(client, config.crawl.max_body_bytes))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_textual(&content_type) {
            if let Some(size) = response
                .content_length()
                .filter(|size| *size > self.max_body_bytes as u64)
            {
                return Err(FetchError::ContentTooLarge {
                    size,
                    max: self.max_body_bytes,
                });
            }
            return Err(FetchError::UnsupportedContent(content_type));
        }

        let (bytes, truncated) = read_capped(response, self.max_body_bytes)
            .await
            .map_err(|e| classify_error(e, timeout))?;

        if truncated {
            tracing::debug!("Truncated body of {} at {} bytes", url, self.max_body_bytes);
        }

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            truncated,
        })
    }
}

/// Reads at most `max` bytes of a response body
///
/// Returns the bytes read and whether anything was left unread.
async fn read_capped(mut response: Response, max: usize) -> Result<(Vec<u8>, bool), reqwest::Error> {
    let mut body = Vec::new();

    while let Some(chunk) = response.chunk().await? {
        let room = max.saturating_sub(body.len());
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            return Ok((body, true));
        }
        body.extend_from_slice(&chunk);
    }

    Ok((body, false))
}

/// Returns true if a Content-Type can carry a page worth extracting
///
/// A missing header is treated as textual.
fn is_textual(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.is_empty()
        || content_type.starts_with("text/")
        || content_type.contains("html")
        || content_type.contains("xml")
        || content_type.contains("json")
}

fn classify_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if error.is_connect() {
        FetchError::Connection(error.to_string())
    } else if error.is_redirect() {
        FetchError::Other(format!("redirect chain exceeded {} hops", MAX_REDIRECTS))
    } else {
        FetchError::Other(error.to_string())
    }
}
