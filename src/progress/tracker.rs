use crate::progress::record::{ProgressRecord, ProgressSnapshot};
use crate::progress::{SessionId, TrackerError};
use crate::state::CrawlStatus;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Process-wide progress store keyed by session
///
/// Cloning is cheap and every clone shares the same entries. Locks are held
/// only for a map lookup plus a field copy, so readers never wait on a fetch.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    entries: Arc<RwLock<HashMap<SessionId, ProgressRecord>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, HashMap<SessionId, ProgressRecord>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("progress lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, ProgressRecord>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("progress lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Marks a session's crawl as running
    ///
    /// Any previous terminal record for the session is superseded.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The session now has a fresh `Running` entry
    /// * `Err(TrackerError::AlreadyRunning)` - The session's entry is already `Running`
    pub fn begin(&self, session: &SessionId) -> Result<(), TrackerError> {
        let mut entries = self.write_guard();

        if entries.get(session).is_some_and(ProgressRecord::is_running) {
            return Err(TrackerError::AlreadyRunning(session.clone()));
        }

        entries.insert(session.clone(), ProgressRecord::running());
        debug!(session = %session, "Crawl started");
        Ok(())
    }

    /// Overwrites a running session's counters
    ///
    /// Ignored if the session is not running, so a late update can never
    /// resurrect a finished crawl.
    pub fn update(&self, session: &SessionId, snapshot: ProgressSnapshot) {
        let mut entries = self.write_guard();
        match entries.get_mut(session) {
            Some(record) if record.is_running() => record.apply(snapshot),
            _ => debug!(session = %session, "Ignoring progress update for idle session"),
        }
    }

    /// Moves a running session to a terminal state
    ///
    /// A non-terminal `status` is recorded as `Failed`. Returns false if the
    /// session was not running (already finished, acknowledged, or unknown).
    pub fn finish(&self, session: &SessionId, status: CrawlStatus, message: Option<String>) -> bool {
        let mut entries = self.write_guard();

        let Some(record) = entries.get_mut(session).filter(|r| r.is_running()) else {
            return false;
        };

        if status.is_terminal() {
            record.status = status;
            record.message = message;
        } else {
            warn!(session = %session, status = %status, "Non-terminal finish status, marking failed");
            record.status = CrawlStatus::Failed;
            record.message =
                Some(message.unwrap_or_else(|| format!("crawl finished with status {}", status)));
        }
        record.finished_at = Some(Utc::now());
        debug!(session = %session, status = %record.status, "Crawl finished");
        true
    }

    /// Returns a copy of a session's record (`Idle` if none exists)
    pub fn read(&self, session: &SessionId) -> ProgressRecord {
        self.read_guard()
            .get(session)
            .cloned()
            .unwrap_or_default()
    }

    /// Clears a finished session back to `Idle`
    pub fn acknowledge(&self, session: &SessionId) -> Result<(), TrackerError> {
        let mut entries = self.write_guard();

        if entries.get(session).is_some_and(ProgressRecord::is_running) {
            return Err(TrackerError::StillRunning(session.clone()));
        }

        entries.insert(session.clone(), ProgressRecord::idle());
        Ok(())
    }

    pub fn is_running(&self, session: &SessionId) -> bool {
        self.read_guard()
            .get(session)
            .is_some_and(ProgressRecord::is_running)
    }

    /// Number of sessions currently crawling
    pub fn running_count(&self) -> usize {
        self.read_guard().values().filter(|r| r.is_running()).count()
    }
}
