//! HTML content extraction
//!
//! This module turns a fetched HTML document into:
//! - The page title (from `<title>`)
//! - Visible text (script, style and similar elements skipped)
//! - Links (from `<a href>`) with anchor text
//! - Images (from `<img src>`) with alt text
//!
//! Malformed HTML never fails; html5ever recovers and whatever it parsed is
//! returned.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Longest anchor or alt text kept
pub const MAX_LABEL_CHARS: usize = 200;

/// Alt text used when an image has neither `alt` nor `title`
pub const DEFAULT_IMAGE_ALT: &str = "Image";

/// Elements whose text is never part of the page content
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// A link found in a document, resolved against the page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub url: Url,
    pub anchor_text: String,
}

/// An image found in a document, resolved against the page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub url: Url,
    pub alt_text: String,
}

/// Everything extracted from one document, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: Option<String>,
    pub text: String,
    pub links: Vec<ExtractedLink>,
    pub images: Vec<ExtractedImage>,
}

/// Converts raw HTML into text, links and images
pub trait ContentExtractor: Send + Sync {
    /// Extracts content; never fails, returning best-effort partial results
    fn extract(&self, html: &str, base_url: &Url) -> ExtractedPage;
}

/// scraper-backed extractor
#[derive(Debug, Clone, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ContentExtractor for HtmlExtractor {
    /// # Example
    ///
    /// ```
    /// use sumi_scrape::crawler::{ContentExtractor, HtmlExtractor};
    /// use url::Url;
    ///
    /// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
    /// let base_url = Url::parse("https://example.com/").unwrap();
    /// let page = HtmlExtractor::new().extract(html, &base_url);
    /// assert_eq!(page.title, Some("Test".to_string()));
    /// assert_eq!(page.links[0].url.as_str(), "https://example.com/page");
    /// ```
    fn extract(&self, html: &str, base_url: &Url) -> ExtractedPage {
        let document = Html::parse_document(html);

        ExtractedPage {
            title: extract_title(&document),
            text: extract_text(&document),
            links: extract_links(&document, base_url),
            images: extract_images(&document, base_url),
        }
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Extracts the visible text of the body (or the whole document if there is no body)
fn extract_text(document: &Html) -> String {
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut parts = Vec::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| SKIPPED_TAGS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        let text = text.trim();
        if !text.is_empty() {
            parts.push(text);
        }
    }

    collapse_whitespace(&parts.join(" "))
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<ExtractedLink> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for element in document.select(&a_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) else {
            continue;
        };

        let anchor_text = label(&element.text().collect::<String>())
            .or_else(|| element.value().attr("title").and_then(label))
            .unwrap_or_else(|| fallback_anchor_text(&url));

        links.push(ExtractedLink { url, anchor_text });
    }

    links
}

/// Extracts all images from the HTML document
fn extract_images(document: &Html, base_url: &Url) -> Vec<ExtractedImage> {
    let Ok(img_selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    document
        .select(&img_selector)
        .filter_map(|element| {
            let url = element
                .value()
                .attr("src")
                .and_then(|src| resolve_link(src, base_url))?;
            Some(ExtractedImage {
                url,
                alt_text: image_alt(&element),
            })
        })
        .collect()
}

fn image_alt(element: &ElementRef<'_>) -> String {
    element
        .value()
        .attr("alt")
        .and_then(label)
        .or_else(|| element.value().attr("title").and_then(label))
        .unwrap_or_else(|| DEFAULT_IMAGE_ALT.to_string())
}

/// Resolves an href to an absolute http(s) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}

/// Anchor text for a link with no visible text: its last path segment, or the URL itself
fn fallback_anchor_text(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|segment| truncate_chars(segment, MAX_LABEL_CHARS))
        .unwrap_or_else(|| url.to_string())
}

/// Whitespace-collapsed, length-capped label, or None if blank
fn label(raw: &str) -> Option<String> {
    let text = collapse_whitespace(raw);
    if text.is_empty() {
        None
    } else {
        Some(truncate_chars(&text, MAX_LABEL_CHARS))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
