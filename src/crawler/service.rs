//! Per-session crawl execution
//!
//! `CrawlService` runs each crawl on its own tokio task so the caller returns
//! immediately and polls the shared `ProgressTracker`. It also owns the
//! per-session cancellation tokens and hands every finished crawl to the
//! history store.

use crate::config::Config;
use crate::crawler::controller::CrawlController;
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::parser::{ContentExtractor, HtmlExtractor};
use crate::crawler::request::CrawlRequest;
use crate::output::CrawlResult;
use crate::progress::{ProgressTracker, SessionId};
use crate::state::CrawlStatus;
use crate::storage::{HistoryEntry, HistoryStore};
use crate::ScrapeError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type SharedHistory = Arc<Mutex<dyn HistoryStore + Send>>;

/// Cancellation tokens of running crawls, tagged with the run that owns them
type CancellationMap = Arc<Mutex<HashMap<SessionId, (u64, CancellationToken)>>>;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Starts, tracks and aborts crawls for any number of sessions
pub struct CrawlService {
    tracker: ProgressTracker,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    exclude: Arc<[String]>,
    history: Option<SharedHistory>,
    config_hash: String,
    cancellations: CancellationMap,
    next_run: AtomicU64,
}

impl CrawlService {
    pub fn new(
        tracker: ProgressTracker,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ContentExtractor>,
        exclude: Vec<String>,
    ) -> Self {
        Self {
            tracker,
            fetcher,
            extractor,
            exclude: exclude.into(),
            history: None,
            config_hash: String::new(),
            cancellations: Arc::new(Mutex::new(HashMap::new())),
            next_run: AtomicU64::new(0),
        }
    }

    /// Builds a service with the HTTP fetcher and HTML extractor
    pub fn from_config(config: &Config, tracker: ProgressTracker) -> Result<Self, ScrapeError> {
        let fetcher = HttpFetcher::from_config(config)?;
        Ok(Self::new(
            tracker,
            Arc::new(fetcher),
            Arc::new(HtmlExtractor::new()),
            config.filter.exclude.clone(),
        ))
    }

    /// Records every finished crawl in `store`, tagged with `config_hash`
    pub fn with_history(
        mut self,
        store: impl HistoryStore + Send + 'static,
        config_hash: impl Into<String>,
    ) -> Self {
        self.history = Some(Arc::new(Mutex::new(store)));
        self.config_hash = config_hash.into();
        self
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Starts a crawl for a session
    ///
    /// The session is claimed before this returns, so a second start for the
    /// same session fails immediately with `AlreadyRunning`.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlHandle)` - The crawl is running on its own task
    /// * `Err(ScrapeError)` - Invalid request, or the session is busy
    pub fn start(&self, session: SessionId, request: CrawlRequest) -> Result<CrawlHandle, ScrapeError> {
        let cancel = CancellationToken::new();
        let seed_url = request.seed_url.to_string();

        let controller = CrawlController::start(
            request,
            session.clone(),
            self.fetcher.clone(),
            self.extractor.clone(),
            self.tracker.clone(),
            &self.exclude,
            cancel.clone(),
        )?;

        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
        lock(&self.cancellations).insert(session.clone(), (run_id, cancel.clone()));

        info!("Session {} started crawl of {}", session, seed_url);

        let crawl = tokio::spawn(controller.run());
        let watcher = tokio::spawn(supervise(
            crawl,
            session.clone(),
            seed_url.clone(),
            run_id,
            self.tracker.clone(),
            self.cancellations.clone(),
            self.history.clone(),
            self.config_hash.clone(),
        ));

        Ok(CrawlHandle {
            session,
            seed_url,
            cancel,
            join: watcher,
        })
    }

    /// Cancels the session's running crawl
    ///
    /// Returns false if the session has no crawl running.
    pub fn abort(&self, session: &SessionId) -> bool {
        match lock(&self.cancellations).get(session) {
            Some((_, cancel)) => {
                info!("Aborting crawl for session {}", session);
                cancel.cancel();
                true
            }
            None => false,
        }
    }
}

/// Waits for a crawl task, turning a panic into a `Failed` result, then records history
#[allow(clippy::too_many_arguments)]
async fn supervise(
    crawl: JoinHandle<CrawlResult>,
    session: SessionId,
    seed_url: String,
    run_id: u64,
    tracker: ProgressTracker,
    cancellations: CancellationMap,
    history: Option<SharedHistory>,
    config_hash: String,
) -> CrawlResult {
    let started = Instant::now();

    let result = match crawl.await {
        Ok(result) => result,
        Err(e) => {
            error!("Crawl task for session {} failed: {}", session, e);
            let message = format!("crawl task failed: {}", e);
            tracker.finish(&session, CrawlStatus::Failed, Some(message.clone()));
            CrawlResult::failed(&seed_url, message, started.elapsed())
        }
    };

    {
        let mut tokens = lock(&cancellations);
        if tokens.get(&session).is_some_and(|(id, _)| *id == run_id) {
            tokens.remove(&session);
        }
    }

    if let Some(history) = history {
        let entry = HistoryEntry::from_result(&result, &config_hash);
        let stored = tokio::task::spawn_blocking(move || lock(&history).record(&entry)).await;
        match stored {
            Ok(Ok(id)) => info!("Recorded crawl of {} as history entry {}", seed_url, id),
            Ok(Err(e)) => error!("Failed to record history for {}: {}", seed_url, e),
            Err(e) => error!("History task for {} failed: {}", seed_url, e),
        }
    }

    result
}

/// A running crawl
pub struct CrawlHandle {
    session: SessionId,
    seed_url: String,
    cancel: CancellationToken,
    join: JoinHandle<CrawlResult>,
}

impl CrawlHandle {
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Requests cancellation; the crawl ends as `Aborted` within one loop iteration
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the crawl's result (history is already recorded when this returns)
    pub async fn wait(self) -> CrawlResult {
        match self.join.await {
            Ok(result) => result,
            Err(e) => {
                error!("Crawl supervisor for session {} failed: {}", self.session, e);
                CrawlResult::failed(
                    &self.seed_url,
                    format!("crawl supervisor failed: {}", e),
                    std::time::Duration::ZERO,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::{FetchError, FetchedPage};
    use crate::crawler::parser::ExtractedPage;
    use crate::progress::TrackerError;
    use crate::storage::SqliteHistory;
    use async_trait::async_trait;
    use std::time::Duration;
    use url::Url;

    /// Serves a two-page site; `/slow` never answers
    struct SiteFetcher;

    #[async_trait]
    impl PageFetcher for SiteFetcher {
        async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchedPage, FetchError> {
            let body = match url.path() {
                "/" => r#"<title>Home</title><a href="/about">About</a>"#,
                "/about" => "<title>About</title><p>About us</p>",
                "/slow" => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    ""
                }
                _ => return Err(FetchError::HttpStatus(404)),
            };
            Ok(FetchedPage {
                final_url: url.clone(),
                status_code: 200,
                content_type: "text/html".to_string(),
                body: body.to_string(),
                truncated: false,
            })
        }
    }

    struct PanickingExtractor;

    impl ContentExtractor for PanickingExtractor {
        fn extract(&self, _html: &str, _base_url: &Url) -> ExtractedPage {
            panic!("extractor exploded");
        }
    }

    fn create_test_service(extractor: Arc<dyn ContentExtractor>) -> CrawlService {
        CrawlService::new(
            ProgressTracker::new(),
            Arc::new(SiteFetcher),
            extractor,
            Vec::new(),
        )
    }

    fn create_test_request(path: &str) -> CrawlRequest {
        let mut config = crate::config::CrawlConfig::default();
        config.inter_page_delay_ms = 0;
        CrawlRequest::from_config(
            Url::parse(&format!("https://example.com{}", path)).unwrap(),
            &config,
        )
    }

    #[tokio::test]
    async fn test_start_and_wait() {
        let service = create_test_service(Arc::new(HtmlExtractor::new()));
        let session = SessionId::new("s1");

        let handle = service.start(session.clone(), create_test_request("/")).unwrap();
        let result = handle.wait().await;

        assert_eq!(result.status, CrawlStatus::Completed);
        assert_eq!(result.pages.len(), 2);
        assert_eq!(result.site_title(), "Home");
        assert_eq!(service.tracker().read(&session).status, CrawlStatus::Completed);
        assert!(!service.abort(&session));
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_until_finished() {
        let service = create_test_service(Arc::new(HtmlExtractor::new()));
        let session = SessionId::new("s1");

        let handle = service
            .start(session.clone(), create_test_request("/slow"))
            .unwrap();

        let second = service.start(session.clone(), create_test_request("/"));
        assert!(matches!(
            second,
            Err(ScrapeError::Tracker(TrackerError::AlreadyRunning(_)))
        ));

        // Other sessions are unaffected
        let other = service
            .start(SessionId::new("s2"), create_test_request("/"))
            .unwrap();
        assert_eq!(other.wait().await.status, CrawlStatus::Completed);

        assert!(service.abort(&session));
        let result = handle.wait().await;
        assert_eq!(result.status, CrawlStatus::Aborted);
        assert!(!service.tracker().is_running(&session));

        let again = service.start(session, create_test_request("/")).unwrap();
        assert_eq!(again.wait().await.status, CrawlStatus::Completed);
    }

    #[tokio::test]
    async fn test_handle_cancel() {
        let service = create_test_service(Arc::new(HtmlExtractor::new()));
        let handle = service
            .start(SessionId::new("s1"), create_test_request("/slow"))
            .unwrap();

        handle.cancel();
        let result = handle.wait().await;
        assert_eq!(result.status, CrawlStatus::Aborted);
    }

    #[tokio::test]
    async fn test_history_recorded_on_finish() {
        let service = create_test_service(Arc::new(HtmlExtractor::new()))
            .with_history(SqliteHistory::new_in_memory().unwrap(), "hash-1");
        let history = service.history.clone().unwrap();

        let handle = service
            .start(SessionId::new("s1"), create_test_request("/"))
            .unwrap();
        handle.wait().await;

        let recent = lock(&history).recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].entry.success);
        assert_eq!(recent[0].entry.title, "Home");
        assert_eq!(recent[0].entry.config_hash, "hash-1");
        assert_eq!(recent[0].entry.pages_fetched, 2);
    }

    #[tokio::test]
    async fn test_panicking_crawl_finishes_as_failed() {
        let service = create_test_service(Arc::new(PanickingExtractor))
            .with_history(SqliteHistory::new_in_memory().unwrap(), "");
        let history = service.history.clone().unwrap();
        let session = SessionId::new("s1");

        let handle = service.start(session.clone(), create_test_request("/")).unwrap();
        let result = handle.wait().await;

        assert_eq!(result.status, CrawlStatus::Failed);
        assert!(result.message.is_some());

        let record = service.tracker().read(&session);
        assert_eq!(record.status, CrawlStatus::Failed);

        let recent = lock(&history).recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert!(!recent[0].entry.success);
    }
}
