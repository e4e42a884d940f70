use serde::Deserialize;
use std::time::Duration;

/// Browser-like user agent sent with every page request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Main configuration structure for Sumi-Scrape
///
/// Every section is optional; missing keys fall back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub filter: FilterConfig,
    pub output: OutputConfig,
}

/// Crawl budgets and timing
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Maximum link depth from the seed page (seed is depth 0)
    pub max_depth: u32,

    /// Maximum number of pages successfully fetched
    pub max_pages: usize,

    /// Maximum number of link records collected
    pub max_links: usize,

    /// Maximum number of image records collected
    pub max_images: usize,

    /// Wall-clock budget for the whole crawl (seconds)
    pub time_budget_secs: u64,

    /// Politeness delay between page fetches (milliseconds)
    pub inter_page_delay_ms: u64,

    /// Timeout for a single page fetch (seconds)
    pub page_timeout_secs: u64,

    /// Margin kept free before the time budget runs out (seconds)
    pub safety_buffer_secs: u64,

    /// Retries for transient fetch failures (timeouts, connection errors, 5xx)
    pub max_retries: u32,

    /// Response bodies beyond this size are truncated
    pub max_body_bytes: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 50,
            max_links: 10_000,
            max_images: 1_000,
            time_budget_secs: 240,
            inter_page_delay_ms: 50,
            page_timeout_secs: 10,
            safety_buffer_secs: 30,
            max_retries: 0,
            max_body_bytes: 500 * 1024,
        }
    }
}

impl CrawlConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    pub fn inter_page_delay(&self) -> Duration {
        Duration::from_millis(self.inter_page_delay_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn safety_buffer(&self) -> Duration {
        Duration::from_secs(self.safety_buffer_secs)
    }
}

/// User agent configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Full User-Agent header value
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Link filtering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Patterns for same-site URLs that are recorded but never fetched
    ///
    /// `*.ext` matches a path suffix, anything else matches a path fragment.
    pub exclude: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let exclude = [
            "*.pdf", "*.zip", "*.gz", "*.tar", "*.rar", "*.7z", "*.exe", "*.dmg", "*.css",
            "*.js", "*.mp3", "*.mp4", "*.avi", "*.mov", "*.woff", "*.woff2", "*.ttf",
            "/login", "/logout", "/admin",
        ];
        Self {
            exclude: exclude.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite scrape history database
    pub history_path: String,

    /// Path to the markdown crawl report
    pub report_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            history_path: "scrape_history.db".to_string(),
            report_path: "crawl_report.md".to_string(),
        }
    }
}
