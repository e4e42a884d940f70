use crate::config::{check_budgets, BudgetLimits, CrawlConfig};
use crate::ConfigError;
use std::time::Duration;
use url::Url;

/// Immutable parameters of one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// Normalized seed URL (depth 0)
    pub seed_url: Url,
    pub max_depth: u32,
    pub max_pages: usize,
    pub max_links: usize,
    pub max_images: usize,
    pub time_budget: Duration,
    pub inter_page_delay: Duration,
    pub page_timeout: Duration,
    /// Margin kept free before `time_budget` runs out
    pub safety_buffer: Duration,
    /// Extra attempts for transient fetch failures
    pub max_retries: u32,
}

impl CrawlRequest {
    /// Builds a request from the crawl section of the configuration
    pub fn from_config(seed_url: Url, config: &CrawlConfig) -> Self {
        Self {
            seed_url,
            max_depth: config.max_depth,
            max_pages: config.max_pages,
            max_links: config.max_links,
            max_images: config.max_images,
            time_budget: config.time_budget(),
            inter_page_delay: config.inter_page_delay(),
            page_timeout: config.page_timeout(),
            safety_buffer: config.safety_buffer(),
            max_retries: config.max_retries,
        }
    }

    /// Checks that the budgets are usable
    ///
    /// The page timeout must be shorter than the safety buffer, and the buffer
    /// shorter than the time budget, so a fetch started just before the
    /// deadline still ends inside the budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_budgets(&BudgetLimits {
            max_pages: self.max_pages,
            max_links: self.max_links,
            max_images: self.max_images,
            time_budget: self.time_budget,
            page_timeout: self.page_timeout,
            safety_buffer: self.safety_buffer,
        })
    }
}
