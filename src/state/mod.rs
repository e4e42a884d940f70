//! State module for tracking a single crawl
//!
//! # Components
//!
//! - `CrawlStatus`: Lifecycle of a crawl (idle, running, and the terminal states)
//! - `Frontier`: Breadth-first work list of depth-tagged URLs
//! - `CrawlState`: Everything one controller owns while a crawl runs

mod crawl_state;
mod frontier;

pub use crawl_state::CrawlState;
pub use frontier::{Frontier, FrontierEntry};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    /// No crawl has started for this session (or the last one was acknowledged)
    Idle,

    /// A crawl is in progress
    Running,

    // ===== Terminal States =====
    /// The crawl finished, either by exhausting the frontier or on a page/link/image budget
    Completed,

    /// The wall-clock deadline was reached
    TimedOut,

    /// A controller-level fault stopped the crawl
    Failed,

    /// The crawl was cancelled by the caller
    Aborted,
}

impl CrawlStatus {
    /// Returns true for the states a crawl ends in
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::TimedOut | Self::Failed | Self::Aborted
        )
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "timed_out" => Some(Self::TimedOut),
            "failed" => Some(Self::Failed),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
