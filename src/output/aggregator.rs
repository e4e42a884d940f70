//! Result aggregation
//!
//! Collects link and image records from every fetched page into
//! insertion-ordered, deduplicated collections with hard caps.

use crate::output::types::{ImageRecord, LinkRecord};
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of offering a record to the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Record stored
    Added,
    /// A record with the same URL was stored earlier; this one is dropped
    Duplicate,
    /// The collection is full; this one is dropped
    CapReached,
}

/// Immutable view of the collected records
///
/// Published to the progress tracker after every page, so pollers can show
/// partial results while the crawl is still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSnapshot {
    pub links: Arc<[LinkRecord]>,
    pub images: Arc<[ImageRecord]>,
}

impl Default for AggregateSnapshot {
    fn default() -> Self {
        Self {
            links: Arc::from(Vec::new()),
            images: Arc::from(Vec::new()),
        }
    }
}

/// Deduplicating, capped collector for links and images
///
/// Records are keyed by URL; the first occurrence wins. The cap check happens
/// in the same step as insertion, so exactly `max_links` links (and
/// `max_images` images) can ever be stored.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    links: Vec<LinkRecord>,
    link_urls: HashSet<String>,
    images: Vec<ImageRecord>,
    image_urls: HashSet<String>,
    max_links: usize,
    max_images: usize,
    links_capped: bool,
    images_capped: bool,
}

impl ResultAggregator {
    pub fn new(max_links: usize, max_images: usize) -> Self {
        Self {
            links: Vec::new(),
            link_urls: HashSet::new(),
            images: Vec::new(),
            image_urls: HashSet::new(),
            max_links,
            max_images,
            links_capped: false,
            images_capped: false,
        }
    }

    /// Offers a link record
    pub fn add_link(&mut self, record: LinkRecord) -> Admission {
        if self.link_urls.contains(&record.url) {
            return Admission::Duplicate;
        }

        if self.links.len() >= self.max_links {
            self.links_capped = true;
            return Admission::CapReached;
        }

        self.link_urls.insert(record.url.clone());
        self.links.push(record);
        Admission::Added
    }

    /// Offers an image record
    pub fn add_image(&mut self, record: ImageRecord) -> Admission {
        if self.image_urls.contains(&record.url) {
            return Admission::Duplicate;
        }

        if self.images.len() >= self.max_images {
            self.images_capped = true;
            return Admission::CapReached;
        }

        self.image_urls.insert(record.url.clone());
        self.images.push(record);
        Admission::Added
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// True once any new record was turned away by a cap
    pub fn cap_hit(&self) -> bool {
        self.links_capped || self.images_capped
    }

    /// Copies the current collections into an immutable snapshot
    pub fn snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot {
            links: Arc::from(self.links.as_slice()),
            images: Arc::from(self.images.as_slice()),
        }
    }

    /// Consumes the aggregator, yielding links and images in insertion order
    pub fn into_parts(self) -> (Vec<LinkRecord>, Vec<ImageRecord>) {
        (self.links, self.images)
    }
}
