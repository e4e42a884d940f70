//! Sumi-Scrape main entry point
//!
//! This is the command-line interface for the Sumi-Scrape site explorer.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sumi_scrape::config::{load_config_with_hash, Config};
use sumi_scrape::output::write_markdown_report;
use sumi_scrape::storage::{open_history, HistoryStore};
use sumi_scrape::url::parse_seed;
use sumi_scrape::{CrawlRequest, CrawlResult, CrawlService, ProgressTracker, SessionId};
use tracing_subscriber::EnvFilter;

/// How often crawl progress is logged
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Sumi-Scrape: a bounded site explorer
///
/// Sumi-Scrape walks a site's internal links breadth-first from a seed URL,
/// within depth, page and time budgets, and collects page text, links and
/// images into a markdown report.
#[derive(Parser, Debug)]
#[command(name = "sumi-scrape")]
#[command(version = "1.0.0")]
#[command(about = "A bounded site explorer", long_about = None)]
struct Cli {
    /// Seed URL (https:// is assumed when no scheme is given)
    #[arg(value_name = "URL", required_unless_present = "history")]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Override the maximum link depth
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Override the maximum number of pages fetched
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Override the wall-clock budget in seconds
    #[arg(long, value_name = "SECS")]
    time_budget: Option<u64>,

    /// Where to write the markdown report
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Print the crawl result as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Don't record this crawl in the history database
    #[arg(long)]
    no_history: bool,

    /// Show the most recent crawls from the history database and exit
    #[arg(long, conflicts_with_all = ["url", "json", "report"])]
    history: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default(), String::new()),
    };

    if cli.history {
        return handle_history(&config);
    }

    handle_crawl(&cli, config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_scrape=info,warn"),
            1 => EnvFilter::new("sumi_scrape=debug,info"),
            2 => EnvFilter::new("sumi_scrape=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --history mode: lists recent crawls
fn handle_history(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.output.history_path);
    println!("History: {}\n", path.display());

    let store = open_history(path)?;
    let total = store.count()?;

    for record in store.recent(20)? {
        let entry = &record.entry;
        let outcome = if entry.success { "ok" } else { "failed" };
        println!(
            "#{:<5} {}  {:<9} {:>3} pages  {}  ({})",
            record.id,
            entry.scraped_at.format("%Y-%m-%d %H:%M:%S"),
            entry.status.to_string(),
            entry.pages_fetched,
            entry.url,
            outcome
        );
        if let Some(message) = &entry.error_message {
            println!("       {}", message);
        }
    }

    println!("\n{} crawl(s) recorded", total);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, mut config: Config, config_hash: String) -> anyhow::Result<()> {
    let raw_url = cli.url.as_deref().context("a seed URL is required")?;
    let seed = parse_seed(raw_url)?;

    if let Some(depth) = cli.max_depth {
        config.crawl.max_depth = depth;
    }
    if let Some(pages) = cli.max_pages {
        config.crawl.max_pages = pages;
    }
    if let Some(secs) = cli.time_budget {
        config.crawl.time_budget_secs = secs;
    }

    let request = CrawlRequest::from_config(seed, &config.crawl);
    tracing::info!(
        "Crawling {} (depth {}, {} pages, {}s budget)",
        request.seed_url,
        request.max_depth,
        request.max_pages,
        request.time_budget.as_secs()
    );

    let mut service = CrawlService::from_config(&config, ProgressTracker::new())?;
    if !cli.no_history {
        let store = open_history(Path::new(&config.output.history_path))?;
        service = service.with_history(store, config_hash);
    }

    let handle = service.start(SessionId::new("cli"), request)?;
    let result = watch(&service, handle).await;

    let report_path = cli
        .report
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.report_path));
    write_markdown_report(&result, &report_path)
        .with_context(|| format!("failed to write {}", report_path.display()))?;
    tracing::info!("Report written to: {}", report_path.display());

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    print_summary(&result);

    if result.succeeded() {
        Ok(())
    } else {
        anyhow::bail!("no pages could be fetched from {}", result.seed_url)
    }
}

/// Logs progress until the crawl ends; Ctrl-C aborts it
async fn watch(service: &CrawlService, handle: sumi_scrape::crawler::CrawlHandle) -> CrawlResult {
    let session = handle.session().clone();
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.tick().await;

    let wait = handle.wait();
    tokio::pin!(wait);

    loop {
        tokio::select! {
            result = &mut wait => return result,
            _ = ticker.tick() => {
                let progress = service.tracker().read(&session);
                tracing::info!(
                    "Progress: {} fetched, {} failed, {} queued, {} links, {} images",
                    progress.pages_fetched,
                    progress.pages_failed,
                    progress.pages_queued,
                    progress.links_found,
                    progress.images_found
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted, stopping crawl");
                service.abort(&session);
            }
        }
    }
}

fn print_summary(result: &CrawlResult) {
    eprintln!();
    eprintln!("=== {} ===", result.site_title());
    eprintln!("Status:  {}", result.status);
    eprintln!("Pages:   {}", result.pages.len());
    eprintln!(
        "Links:   {} ({} external)",
        result.links.len(),
        result.external_link_count()
    );
    eprintln!("Images:  {}", result.images.len());
    eprintln!("Errors:  {}", result.errors.len());
    eprintln!("Elapsed: {:.1}s", result.elapsed.as_secs_f64());
    if result.truncated {
        eprintln!("Results are partial: a budget was reached before the site was exhausted");
    }
}
