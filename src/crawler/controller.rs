//! Crawl controller - the bounded breadth-first traversal
//!
//! One controller drives one crawl from its seed to a terminal state:
//! - Dequeues depth-tagged URLs in FIFO order
//! - Fetches each page (with cancellation, timeout and retry handling)
//! - Extracts content and feeds links and images to the aggregator
//! - Enqueues unvisited same-site links for the next depth level
//! - Reports progress to the tracker after every page
//!
//! Budgets are checked cooperatively at the top of every iteration, before
//! the next fetch. A fetch started just before the deadline can overrun it by
//! at most the page timeout, which validation keeps below the safety buffer.

use crate::crawler::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::crawler::parser::ContentExtractor;
use crate::crawler::request::CrawlRequest;
use crate::output::{CrawlResult, ImageRecord, LinkRecord, PageContent, PageError, PageErrorKind};
use crate::progress::{ProgressSnapshot, ProgressTracker, SessionId};
use crate::state::{CrawlState, CrawlStatus, FrontierEntry};
use crate::url::{normalize_url, LinkClass, UrlFilter};
use crate::ScrapeError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Why the traversal loop stopped
#[derive(Debug)]
enum Stop {
    Cancelled,
    FrontierExhausted,
    PageBudget,
    Deadline,
    Fault(ScrapeError),
}

enum FetchOutcome {
    Page(FetchedPage),
    Failed(FetchError),
    Cancelled,
}

/// Finishes the session's tracker entry if the controller goes away early
///
/// A panic inside the crawl, or its future being dropped mid-flight, would
/// otherwise leave the session `Running` forever.
struct SessionGuard {
    tracker: ProgressTracker,
    session: SessionId,
    armed: bool,
}

impl SessionGuard {
    fn finish(mut self, status: CrawlStatus, message: Option<String>) {
        self.armed = false;
        self.tracker.finish(&self.session, status, message);
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.armed {
            error!("Crawl for session {} ended without finishing", self.session);
            self.tracker.finish(
                &self.session,
                CrawlStatus::Failed,
                Some("crawl ended unexpectedly".to_string()),
            );
        }
    }
}

/// Drives one crawl
pub struct CrawlController {
    request: CrawlRequest,
    session: SessionId,
    state: CrawlState,
    filter: UrlFilter,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    tracker: ProgressTracker,
    cancel: CancellationToken,
    guard: SessionGuard,
}

impl CrawlController {
    /// Validates the request and claims the session
    ///
    /// On success the session's tracker entry is `Running` and the seed is in
    /// the frontier. Nothing is fetched until [`run`](Self::run).
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlController)` - Ready to run
    /// * `Err(ScrapeError::Config)` - The budgets are inconsistent
    /// * `Err(ScrapeError::UrlError)` - The seed is not a crawlable URL
    /// * `Err(ScrapeError::Tracker)` - The session already has a crawl running
    pub fn start(
        request: CrawlRequest,
        session: SessionId,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ContentExtractor>,
        tracker: ProgressTracker,
        exclude: &[String],
        cancel: CancellationToken,
    ) -> Result<Self, ScrapeError> {
        request.validate()?;

        let seed = normalize_url(request.seed_url.as_str(), &request.seed_url)?;
        let filter = UrlFilter::for_seed(&seed, exclude)?;

        tracker.begin(&session)?;
        let guard = SessionGuard {
            tracker: tracker.clone(),
            session: session.clone(),
            armed: true,
        };

        let mut state = CrawlState::new(&request);
        state.enqueue(seed, 0);

        let controller = Self {
            request,
            session,
            state,
            filter,
            fetcher,
            extractor,
            tracker,
            cancel,
            guard,
        };
        controller.report_progress(None);
        Ok(controller)
    }

    /// Runs the crawl to a terminal state
    ///
    /// Always returns a result; whatever was collected before a timeout,
    /// abort or fault is kept. The tracker entry is finished before returning.
    pub async fn run(mut self) -> CrawlResult {
        info!(
            "Starting crawl of {} (depth {}, {} pages, {:?} budget)",
            self.request.seed_url,
            self.request.max_depth,
            self.request.max_pages,
            self.request.time_budget
        );

        let stop = self.crawl().await;
        let cap_hit = self.state.aggregator().cap_hit();

        let (status, truncated, message) = match stop {
            Stop::Cancelled => (
                CrawlStatus::Aborted,
                true,
                Some("crawl cancelled".to_string()),
            ),
            Stop::FrontierExhausted => (CrawlStatus::Completed, cap_hit, None),
            Stop::PageBudget => (
                CrawlStatus::Completed,
                true,
                Some(format!("page budget of {} reached", self.request.max_pages)),
            ),
            Stop::Deadline => (
                CrawlStatus::TimedOut,
                true,
                Some(format!(
                    "time budget of {:?} reached",
                    self.request.time_budget
                )),
            ),
            Stop::Fault(fault) => {
                error!("Crawl of {} failed: {}", self.request.seed_url, fault);
                (
                    CrawlStatus::Failed,
                    !self.state.frontier_is_empty(),
                    Some(fault.to_string()),
                )
            }
        };

        let result = self.state.into_result(status, truncated, message.clone());
        self.guard.finish(status, message);

        info!(
            "Crawl of {} finished: {} ({} pages, {} links, {} images, {} errors) in {:.1}s",
            result.seed_url,
            result.status,
            result.pages.len(),
            result.links.len(),
            result.images.len(),
            result.errors.len(),
            result.elapsed.as_secs_f64()
        );

        result
    }

    /// The traversal loop
    async fn crawl(&mut self) -> Stop {
        loop {
            if self.cancel.is_cancelled() {
                return Stop::Cancelled;
            }
            if self.state.frontier_is_empty() {
                return Stop::FrontierExhausted;
            }
            if self.state.pages_fetched() >= self.request.max_pages {
                return Stop::PageBudget;
            }
            if self.state.deadline_passed() {
                return Stop::Deadline;
            }

            let Some(entry) = self.state.next_entry() else {
                return Stop::FrontierExhausted;
            };
            if let Err(fault) = self.state.check_entry(&entry, self.request.max_depth) {
                return Stop::Fault(fault);
            }

            debug!("Fetching {} (depth {})", entry.url, entry.depth);
            match self.fetch_with_retries(&entry.url).await {
                FetchOutcome::Page(page) => self.process_page(&entry, page),
                FetchOutcome::Failed(e) => {
                    warn!("Failed to fetch {}: {}", entry.url, e);
                    self.state.record_error(e.to_page_error(&entry.url));
                }
                FetchOutcome::Cancelled => return Stop::Cancelled,
            }

            self.report_progress(Some(&entry.url));
            self.politeness_delay().await;
        }
    }

    /// Fetches a URL, retrying transient failures while time and retries remain
    async fn fetch_with_retries(&self, url: &Url) -> FetchOutcome {
        let timeout = self.request.page_timeout;
        let mut attempt = 0;

        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return FetchOutcome::Cancelled,
                result = tokio::time::timeout(timeout, self.fetcher.fetch(url, timeout)) => {
                    result.unwrap_or(Err(FetchError::Timeout(timeout)))
                }
            };

            match result {
                Ok(page) => return FetchOutcome::Page(page),
                Err(e)
                    if e.is_transient()
                        && attempt < self.request.max_retries
                        && !self.state.deadline_passed()
                        && !self.cancel.is_cancelled() =>
                {
                    attempt += 1;
                    debug!(
                        "Retrying {} after {} (attempt {}/{})",
                        url, e, attempt, self.request.max_retries
                    );
                }
                Err(e) => return FetchOutcome::Failed(e),
            }
        }
    }

    /// Records a fetched page and everything it links to
    fn process_page(&mut self, entry: &FrontierEntry, page: FetchedPage) {
        let Some(page_url) = self.resolve_final_url(entry, &page) else {
            return;
        };

        let extracted = self.extractor.extract(&page.body, &page_url);
        let source_page = page_url.to_string();

        for link in extracted.links {
            let url = match normalize_url(link.url.as_str(), &page_url) {
                Ok(url) => url,
                Err(e) => {
                    debug!("Skipping link {} on {}: {}", link.url, page_url, e);
                    continue;
                }
            };

            let class = self.filter.classify(&url);
            if class == LinkClass::Image {
                self.state.aggregator_mut().add_image(ImageRecord {
                    url: url.to_string(),
                    alt_text: link.anchor_text,
                    source_page: source_page.clone(),
                });
                continue;
            }

            self.state.aggregator_mut().add_link(LinkRecord {
                url: url.to_string(),
                source_page: source_page.clone(),
                anchor_text: link.anchor_text,
                external: class == LinkClass::External,
            });

            if class.should_crawl()
                && entry.depth < self.request.max_depth
                && self.state.enqueue(url.clone(), entry.depth + 1)
            {
                debug!("Queued {} at depth {}", url, entry.depth + 1);
            }
        }

        for image in extracted.images {
            match normalize_url(image.url.as_str(), &page_url) {
                Ok(url) => {
                    self.state.aggregator_mut().add_image(ImageRecord {
                        url: url.to_string(),
                        alt_text: image.alt_text,
                        source_page: source_page.clone(),
                    });
                }
                Err(e) => debug!("Skipping image {} on {}: {}", image.url, page_url, e),
            }
        }

        self.state.record_page(PageContent {
            url: source_page,
            depth: entry.depth,
            title: extracted.title,
            text: extracted.text,
        });

        info!(
            "Fetched {} (depth {}, {}/{} pages, {} queued)",
            page_url,
            entry.depth,
            self.state.pages_fetched(),
            self.request.max_pages,
            self.state.frontier_len()
        );
    }

    /// Re-evaluates the page URL after redirects
    ///
    /// Returns the URL the page should be recorded under, or None if it must
    /// be dropped (off-site target, or an on-site target already visited).
    fn resolve_final_url(&mut self, entry: &FrontierEntry, page: &FetchedPage) -> Option<Url> {
        let final_url = match normalize_url(page.final_url.as_str(), &entry.url) {
            Ok(url) => url,
            Err(e) => {
                self.state.record_error(PageError {
                    url: entry.url.to_string(),
                    kind: PageErrorKind::Other,
                    status_code: None,
                    message: format!("unusable redirect target {}: {}", page.final_url, e),
                });
                return None;
            }
        };

        if final_url == entry.url {
            return Some(final_url);
        }

        if !self.filter.is_same_site(&final_url) {
            warn!("{} redirected off-site to {}", entry.url, final_url);
            self.state.record_error(PageError {
                url: entry.url.to_string(),
                kind: PageErrorKind::OffSiteRedirect,
                status_code: Some(page.status_code),
                message: format!("redirected off-site to {}", final_url),
            });
            return None;
        }

        if !self.state.mark_visited(&final_url) {
            debug!(
                "{} redirected to already visited {}, skipping",
                entry.url, final_url
            );
            return None;
        }

        debug!("{} redirected to {}", entry.url, final_url);
        Some(final_url)
    }

    /// Sleeps between pages unless the remaining time is too short or nothing is left to fetch
    async fn politeness_delay(&self) {
        let delay = self.request.inter_page_delay;
        if delay.is_zero()
            || self.state.frontier_is_empty()
            || self.state.pages_fetched() >= self.request.max_pages
            || self.state.time_remaining() < delay * 2
        {
            return;
        }

        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }

    fn report_progress(&self, current_url: Option<&Url>) {
        let aggregator = self.state.aggregator();
        self.tracker.update(
            &self.session,
            ProgressSnapshot {
                pages_fetched: self.state.pages_fetched(),
                pages_failed: self.state.pages_failed(),
                pages_queued: self.state.frontier_len(),
                links_found: aggregator.link_count(),
                images_found: aggregator.image_count(),
                current_url: current_url.map(Url::to_string),
                results: aggregator.snapshot(),
            },
        );
    }
}
