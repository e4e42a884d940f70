/// File extensions that identify image resources
pub const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".bmp", ".ico", ".avif",
];

/// Checks if a URL path matches an exclusion pattern
///
/// Two kinds of pattern are supported:
/// 1. Extension: `"*.pdf"` matches any path ending in `.pdf`
/// 2. Path fragment: `"/login"` matches any path containing `/login`
///
/// Matching is case-insensitive; `pattern` is expected in lowercase
/// (`UrlFilter` lowercases its patterns).
///
/// # Examples
///
/// ```
/// use sumi_scrape::url::matches_exclusion;
///
/// assert!(matches_exclusion("*.pdf", "/files/Report.PDF"));
/// assert!(matches_exclusion("/admin", "/admin/users"));
/// assert!(!matches_exclusion("*.pdf", "/pdf-guide"));
/// ```
pub fn matches_exclusion(pattern: &str, path: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }

    let path = path.to_lowercase();
    if let Some(extension) = pattern.strip_prefix('*') {
        path.ends_with(extension)
    } else {
        path.contains(pattern)
    }
}

/// Returns true if the path points at an image file
pub fn is_image_path(path: &str) -> bool {
    let path = path.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
