use crate::config::types::{Config, CrawlConfig, FilterConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use std::time::Duration;

/// Smallest accepted body cap
const MIN_BODY_BYTES: usize = 1024;

/// Longest accepted crawl time budget
pub const MAX_TIME_BUDGET: Duration = Duration::from_secs(24 * 60 * 60);

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_filter_config(&config.filter)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl budgets
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    check_budgets(&BudgetLimits {
        max_pages: config.max_pages,
        max_links: config.max_links,
        max_images: config.max_images,
        time_budget: config.time_budget(),
        page_timeout: config.page_timeout(),
        safety_buffer: config.safety_buffer(),
    })?;

    if config.max_body_bytes < MIN_BODY_BYTES {
        return Err(ConfigError::Validation(format!(
            "max_body_bytes must be >= {}, got {}",
            MIN_BODY_BYTES, config.max_body_bytes
        )));
    }

    Ok(())
}

/// Budget values shared by the config file and a ready-made crawl request
pub(crate) struct BudgetLimits {
    pub max_pages: usize,
    pub max_links: usize,
    pub max_images: usize,
    pub time_budget: Duration,
    pub page_timeout: Duration,
    pub safety_buffer: Duration,
}

/// Checks the budget relationships the crawl controller relies on
///
/// A single fetch may overrun the deadline by at most its own timeout, so the
/// timeout has to fit inside the safety buffer, and the buffer inside the
/// total time budget.
pub(crate) fn check_budgets(limits: &BudgetLimits) -> Result<(), ConfigError> {
    if limits.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if limits.max_links < 1 {
        return Err(ConfigError::Validation(
            "max_links must be >= 1".to_string(),
        ));
    }

    if limits.max_images < 1 {
        return Err(ConfigError::Validation(
            "max_images must be >= 1".to_string(),
        ));
    }

    if limits.page_timeout.is_zero() {
        return Err(ConfigError::Validation(
            "page timeout must be greater than zero".to_string(),
        ));
    }

    if limits.page_timeout >= limits.safety_buffer {
        return Err(ConfigError::Validation(format!(
            "page timeout ({:?}) must be shorter than the safety buffer ({:?})",
            limits.page_timeout, limits.safety_buffer
        )));
    }

    if limits.time_budget > MAX_TIME_BUDGET {
        return Err(ConfigError::Validation(format!(
            "time budget ({:?}) must not exceed {:?}",
            limits.time_budget, MAX_TIME_BUDGET
        )));
    }

    if limits.safety_buffer >= limits.time_budget {
        return Err(ConfigError::Validation(format!(
            "safety buffer ({:?}) must be shorter than the time budget ({:?})",
            limits.safety_buffer, limits.time_budget
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user agent cannot be empty".to_string(),
        ));
    }

    if config.value.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(
            "user agent cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates exclusion patterns
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    for pattern in &config.exclude {
        validate_exclusion_pattern(pattern)?;
    }
    Ok(())
}

/// Validates a single exclusion pattern
fn validate_exclusion_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Exclusion pattern cannot be empty".to_string(),
        ));
    }

    if let Some(extension) = pattern.strip_prefix('*') {
        if !extension.starts_with('.') || extension.len() < 2 {
            return Err(ConfigError::InvalidPattern(format!(
                "Extension pattern '{}' must look like '*.ext'",
                pattern
            )));
        }
    }

    if pattern.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidPattern(format!(
            "Exclusion pattern '{}' cannot contain whitespace",
            pattern
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.history_path.is_empty() {
        return Err(ConfigError::Validation(
            "history_path cannot be empty".to_string(),
        ));
    }

    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
