//! URL handling module for Sumi-Scrape
//!
//! This module provides URL normalization, same-site detection, exclusion
//! matching, and link classification.

mod domain;
mod matcher;
mod normalize;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_same_site, registered_domain};
pub use matcher::{is_image_path, matches_exclusion, IMAGE_EXTENSIONS};
pub use normalize::{normalize_url, parse_seed};

/// How a discovered URL is treated by the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkClass {
    /// Same-site page - recorded and eligible for fetching
    Internal,
    /// Different site - recorded but never fetched
    External,
    /// Same-site but matches an exclusion pattern - recorded, never fetched
    Excluded,
    /// Points at an image file - routed to the image collection
    Image,
}

impl LinkClass {
    /// Returns true if URLs of this class may enter the frontier
    pub fn should_crawl(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Classifies URLs relative to one crawl's seed
#[derive(Debug, Clone)]
pub struct UrlFilter {
    site_domain: String,
    exclude: Vec<String>,
}

impl UrlFilter {
    /// Builds a filter for the site the seed URL belongs to
    ///
    /// # Arguments
    ///
    /// * `seed` - The normalized seed URL
    /// * `exclude` - Exclusion patterns (see [`matches_exclusion`])
    pub fn for_seed(seed: &Url, exclude: &[String]) -> Result<Self, UrlError> {
        let host = extract_domain(seed).ok_or(UrlError::MissingDomain)?;
        Ok(Self {
            site_domain: registered_domain(&host),
            exclude: exclude.iter().map(|p| p.to_lowercase()).collect(),
        })
    }

    /// The registered domain of the seed
    pub fn site_domain(&self) -> &str {
        &self.site_domain
    }

    /// Returns true if the URL belongs to the seed's site
    pub fn is_same_site(&self, url: &Url) -> bool {
        is_same_site(url, &self.site_domain)
    }

    /// Returns true if the URL path matches any exclusion pattern
    pub fn is_excluded(&self, url: &Url) -> bool {
        self.exclude
            .iter()
            .any(|pattern| matches_exclusion(pattern, url.path()))
    }

    /// Classifies a normalized URL
    ///
    /// Priority order:
    /// 1. Image (any site)
    /// 2. External
    /// 3. Excluded
    /// 4. Internal
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_scrape::url::{LinkClass, UrlFilter};
    /// use url::Url;
    ///
    /// let seed = Url::parse("https://example.com/").unwrap();
    /// let filter = UrlFilter::for_seed(&seed, &["*.pdf".to_string()]).unwrap();
    ///
    /// let page = Url::parse("https://example.com/about").unwrap();
    /// assert_eq!(filter.classify(&page), LinkClass::Internal);
    ///
    /// let doc = Url::parse("https://example.com/report.pdf").unwrap();
    /// assert_eq!(filter.classify(&doc), LinkClass::Excluded);
    /// ```
    pub fn classify(&self, url: &Url) -> LinkClass {
        if is_image_path(url.path()) {
            return LinkClass::Image;
        }

        if !self.is_same_site(url) {
            return LinkClass::External;
        }

        if self.is_excluded(url) {
            return LinkClass::Excluded;
        }

        LinkClass::Internal
    }
}
