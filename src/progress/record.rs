use crate::output::AggregateSnapshot;
use crate::state::CrawlStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress of one session's crawl, as seen by a poller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub status: CrawlStatus,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub pages_queued: usize,
    pub links_found: usize,
    pub images_found: usize,

    /// URL most recently processed
    pub current_url: Option<String>,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Terminal diagnostic (fault description, abort reason)
    pub message: Option<String>,

    /// Links and images collected so far
    #[serde(skip)]
    pub results: AggregateSnapshot,
}

impl ProgressRecord {
    /// Record for a session with no crawl
    pub fn idle() -> Self {
        Self {
            status: CrawlStatus::Idle,
            pages_fetched: 0,
            pages_failed: 0,
            pages_queued: 0,
            links_found: 0,
            images_found: 0,
            current_url: None,
            started_at: None,
            finished_at: None,
            message: None,
            results: AggregateSnapshot::default(),
        }
    }

    /// Fresh record for a crawl starting now
    pub fn running() -> Self {
        Self {
            status: CrawlStatus::Running,
            started_at: Some(Utc::now()),
            ..Self::idle()
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == CrawlStatus::Running
    }

    /// Overwrites the counters with a controller snapshot
    pub fn apply(&mut self, snapshot: ProgressSnapshot) {
        self.pages_fetched = snapshot.pages_fetched;
        self.pages_failed = snapshot.pages_failed;
        self.pages_queued = snapshot.pages_queued;
        self.links_found = snapshot.links_found;
        self.images_found = snapshot.images_found;
        self.current_url = snapshot.current_url;
        self.results = snapshot.results;
    }
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self::idle()
    }
}

/// Counters a controller reports after each page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub pages_queued: usize,
    pub links_found: usize,
    pub images_found: usize,
    pub current_url: Option<String>,
    pub results: AggregateSnapshot,
}
