use crate::config::MAX_TIME_BUDGET;
use crate::crawler::CrawlRequest;
use crate::output::{CrawlResult, PageContent, PageError, ResultAggregator};
use crate::state::frontier::{Frontier, FrontierEntry};
use crate::state::CrawlStatus;
use crate::ScrapeError;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Mutable state of one crawl
///
/// Owned by a single controller for the lifetime of the crawl; nothing else
/// mutates it. The visited set covers every URL that was ever enqueued (plus
/// on-site redirect targets), so a URL can enter the frontier at most once.
#[derive(Debug)]
pub struct CrawlState {
    seed_url: Url,
    visited: HashSet<String>,
    frontier: Frontier,
    pages_fetched: usize,
    pages_failed: usize,
    started_at: Instant,
    deadline: Instant,
    pages: Vec<PageContent>,
    aggregator: ResultAggregator,
    errors: Vec<PageError>,
}

impl CrawlState {
    /// Creates the state for a request, with the deadline measured from now
    ///
    /// Budgets beyond `MAX_TIME_BUDGET` are clamped to it.
    pub fn new(request: &CrawlRequest) -> Self {
        let started_at = Instant::now();
        let usable = request
            .time_budget
            .min(MAX_TIME_BUDGET)
            .saturating_sub(request.safety_buffer);

        Self {
            seed_url: request.seed_url.clone(),
            visited: HashSet::new(),
            frontier: Frontier::new(),
            pages_fetched: 0,
            pages_failed: 0,
            started_at,
            deadline: started_at + usable,
            pages: Vec::new(),
            aggregator: ResultAggregator::new(request.max_links, request.max_images),
            errors: Vec::new(),
        }
    }

    /// Marks a URL visited and appends it to the frontier
    ///
    /// Returns false (and enqueues nothing) if the URL was already visited.
    pub fn enqueue(&mut self, url: Url, depth: u32) -> bool {
        if !self.visited.insert(url.as_str().to_string()) {
            return false;
        }
        self.frontier.push(url, depth);
        true
    }

    /// Marks a URL visited without enqueueing it
    ///
    /// Returns false if it was already visited.
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(url.as_str().to_string())
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    pub fn next_entry(&mut self) -> Option<FrontierEntry> {
        self.frontier.pop()
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn frontier_is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Checks a dequeued entry against the traversal invariants
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The entry may be fetched
    /// * `Err(ScrapeError::ControllerFault)` - The violated invariant
    pub fn check_entry(&self, entry: &FrontierEntry, max_depth: u32) -> Result<(), ScrapeError> {
        if entry.depth > max_depth {
            return Err(ScrapeError::ControllerFault(format!(
                "frontier entry {} has depth {} beyond max depth {}",
                entry.url, entry.depth, max_depth
            )));
        }

        if !self.is_visited(&entry.url) {
            return Err(ScrapeError::ControllerFault(format!(
                "frontier entry {} was never marked visited",
                entry.url
            )));
        }

        if let Some(next_depth) = self.frontier.peek_depth() {
            if next_depth < entry.depth {
                return Err(ScrapeError::ControllerFault(format!(
                    "frontier out of order: depth {} queued behind depth {}",
                    next_depth, entry.depth
                )));
            }
        }

        Ok(())
    }

    /// Records a successfully fetched page
    pub fn record_page(&mut self, page: PageContent) {
        self.pages_fetched += 1;
        self.pages.push(page);
    }

    /// Records a page failure
    pub fn record_error(&mut self, error: PageError) {
        self.pages_failed += 1;
        self.errors.push(error);
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn pages_failed(&self) -> usize {
        self.pages_failed
    }

    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    pub fn aggregator_mut(&mut self) -> &mut ResultAggregator {
        &mut self.aggregator
    }

    pub fn deadline_passed(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Time left until the deadline (zero once it has passed)
    pub fn time_remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Converts the state into the final result, keeping everything collected so far
    pub fn into_result(
        self,
        status: CrawlStatus,
        truncated: bool,
        message: Option<String>,
    ) -> CrawlResult {
        let elapsed = self.elapsed();
        let (links, images) = self.aggregator.into_parts();

        CrawlResult {
            seed_url: self.seed_url.to_string(),
            status,
            pages: self.pages,
            links,
            images,
            errors: self.errors,
            truncated,
            elapsed,
            message,
        }
    }
}
