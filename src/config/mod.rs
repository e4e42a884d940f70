//! Configuration module for Sumi-Scrape
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; an empty file yields the default crawl budgets.
//!
//! # Example
//!
//! ```no_run
//! use sumi_scrape::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scrape.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawl.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, FilterConfig, OutputConfig, UserAgentConfig, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::MAX_TIME_BUDGET;

pub(crate) use validation::{check_budgets, BudgetLimits};
