//! Progress tracking shared between crawls and pollers
//!
//! A `ProgressTracker` is a keyed store of `ProgressRecord`s, one per session.
//! The controller running a session's crawl is its only writer; any number of
//! pollers may read concurrently. The tracker also enforces single-flight
//! crawling: a session can have at most one `Running` entry.

mod record;
mod tracker;

pub use record::{ProgressRecord, ProgressSnapshot};
pub use tracker::ProgressTracker;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifies the caller a crawl belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Progress tracker errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("A crawl is already running for session {0}")]
    AlreadyRunning(SessionId),

    #[error("Cannot acknowledge session {0} while its crawl is running")]
    StillRunning(SessionId),
}
