use std::collections::VecDeque;
use url::Url;

/// A URL waiting to be fetched, tagged with its discovery depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
}

/// FIFO work list for breadth-first traversal
///
/// Entries are only ever appended with a depth equal to or one greater than
/// the entry being processed, so popping from the front visits every depth-d
/// URL before any depth-(d+1) URL.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, url: Url, depth: u32) {
        self.queue.push_back(FrontierEntry { url, depth });
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Depth of the next entry, if any
    pub fn peek_depth(&self) -> Option<u32> {
        self.queue.front().map(|e| e.depth)
    }
}
