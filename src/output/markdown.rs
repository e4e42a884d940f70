//! Markdown crawl report
//!
//! Renders a `CrawlResult` as a human-readable report: a summary header,
//! a partial-results banner when the crawl was cut short, then tables of
//! pages, links, images and per-page errors.

use crate::output::types::CrawlResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Longest page excerpt shown in the pages table
const EXCERPT_CHARS: usize = 120;

/// Writes a markdown report for a crawl result
///
/// # Arguments
///
/// * `result` - The crawl result to render
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(io::Error)` - Failed to create or write the file
pub fn write_markdown_report(result: &CrawlResult, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_report(result);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl result as markdown
pub fn format_markdown_report(result: &CrawlResult) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", escape_cell(result.site_title())));

    if result.is_partial() {
        md.push_str(&format!(
            "> **Partial results**: the crawl ended with status `{}` before the whole site was explored.\n\n",
            result.status
        ));
    }

    // Run summary
    md.push_str("## Summary\n\n");
    md.push_str(&format!("- **Seed URL**: {}\n", result.seed_url));
    md.push_str(&format!("- **Status**: {}\n", result.status));
    md.push_str(&format!("- **Pages**: {}\n", result.pages.len()));
    md.push_str(&format!(
        "- **Links**: {} ({} external)\n",
        result.links.len(),
        result.external_link_count()
    ));
    md.push_str(&format!("- **Images**: {}\n", result.images.len()));
    md.push_str(&format!("- **Errors**: {}\n", result.errors.len()));
    md.push_str(&format!(
        "- **Elapsed**: {:.2} seconds\n",
        result.elapsed.as_secs_f64()
    ));
    if let Some(message) = &result.message {
        md.push_str(&format!("- **Note**: {}\n", message));
    }
    md.push('\n');

    if !result.pages.is_empty() {
        md.push_str("## Pages\n\n");
        md.push_str("| Depth | URL | Title | Excerpt |\n");
        md.push_str("|-------|-----|-------|---------|\n");
        for page in &result.pages {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                page.depth,
                page.url,
                escape_cell(page.title.as_deref().unwrap_or("")),
                escape_cell(&excerpt(&page.text))
            ));
        }
        md.push('\n');
    }

    if !result.links.is_empty() {
        md.push_str("## Links\n\n");
        md.push_str("| URL | Anchor Text | Source Page | External |\n");
        md.push_str("|-----|-------------|-------------|----------|\n");
        for link in &result.links {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                link.url,
                escape_cell(&link.anchor_text),
                link.source_page,
                if link.external { "yes" } else { "no" }
            ));
        }
        md.push('\n');
    }

    if !result.images.is_empty() {
        md.push_str("## Images\n\n");
        md.push_str("| URL | Alt Text | Source Page |\n");
        md.push_str("|-----|----------|-------------|\n");
        for image in &result.images {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                image.url,
                escape_cell(&image.alt_text),
                image.source_page
            ));
        }
        md.push('\n');
    }

    if !result.errors.is_empty() {
        md.push_str("## Errors\n\n");
        md.push_str("| URL | Kind | Message |\n");
        md.push_str("|-----|------|---------|\n");
        for error in &result.errors {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                error.url,
                error.kind.as_str(),
                escape_cell(&error.message)
            ));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str(&format!(
        "*Report generated by Sumi-Scrape on {}*\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    md
}

/// Flattens whitespace and escapes pipes so text fits in one table cell
fn escape_cell(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
