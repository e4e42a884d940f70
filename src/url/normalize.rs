use crate::UrlError;
use url::Url;

/// Normalizes a (possibly relative) URL against the page it was found on
///
/// # Normalization Steps
///
/// 1. Resolve the reference against `base`; absolute references ignore it
/// 2. Reject anything that is not `http` or `https`
/// 3. Require a host
/// 4. Lowercase scheme and host, drop the port when it is the scheme default
/// 5. Remove the fragment (everything after #)
///
/// Trailing slashes and query parameter order are left untouched, so
/// `/a` and `/a/`, or `?x=1&y=2` and `?y=2&x=1`, stay distinct URLs.
///
/// # Arguments
///
/// * `raw` - The href or URL string to normalize
/// * `base` - The URL of the page the reference appeared on
///
/// # Returns
///
/// * `Ok(Url)` - Normalized absolute URL
/// * `Err(UrlError)` - The reference was rejected
///
/// # Examples
///
/// ```
/// use sumi_scrape::url::normalize_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/").unwrap();
/// let url = normalize_url("../About#team", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/About");
/// ```
pub fn normalize_url(raw: &str, base: &Url) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let mut url = base.join(raw).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(&mut url)?;
    Ok(url)
}

/// Parses a user-supplied seed URL
///
/// A seed without a scheme is assumed to be `https://`. The result goes
/// through the same canonicalization as [`normalize_url`].
///
/// # Examples
///
/// ```
/// use sumi_scrape::url::parse_seed;
///
/// let seed = parse_seed("Example.COM/start").unwrap();
/// assert_eq!(seed.as_str(), "https://example.com/start");
/// ```
pub fn parse_seed(raw: &str) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(&mut url)?;
    Ok(url)
}

fn canonicalize(url: &mut Url) -> Result<(), UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?;
    if host.is_empty() {
        return Err(UrlError::MissingDomain);
    }

    // The url crate already lowercases hosts of special schemes; this keeps
    // the guarantee explicit for anything it passes through untouched.
    let lowered = host.to_lowercase();
    if lowered != host {
        url.set_host(Some(&lowered))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    }

    if url.port().is_some() && url.port() == default_port(url.scheme()) {
        url.set_port(None)
            .map_err(|_| UrlError::Malformed("Failed to clear default port".to_string()))?;
    }

    url.set_fragment(None);
    Ok(())
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/blog/post").unwrap()
    }

    #[test]
    fn test_resolve_relative_path() {
        let result = normalize_url("other", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/blog/other");
    }

    #[test]
    fn test_resolve_root_relative_path() {
        let result = normalize_url("/about", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_absolute_url_ignores_base() {
        let result = normalize_url("https://other.org/x", &base()).unwrap();
        assert_eq!(result.as_str(), "https://other.org/x");
    }

    #[test]
    fn test_protocol_relative_url() {
        let result = normalize_url("//cdn.example.com/lib", &base()).unwrap();
        assert_eq!(result.as_str(), "https://cdn.example.com/lib");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("/page#section", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_lowercase_scheme_and_host() {
        let result = normalize_url("HTTPS://EXAMPLE.COM/Page", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_remove_default_ports() {
        let http = normalize_url("http://example.com:80/a", &base()).unwrap();
        assert_eq!(http.as_str(), "http://example.com/a");

        let https = normalize_url("https://example.com:443/a", &base()).unwrap();
        assert_eq!(https.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_keep_non_default_port() {
        let result = normalize_url("http://example.com:8080/a", &base()).unwrap();
        assert_eq!(result.as_str(), "http://example.com:8080/a");
    }

    #[test]
    fn test_trailing_slash_stays_distinct() {
        let with = normalize_url("/page/", &base()).unwrap();
        let without = normalize_url("/page", &base()).unwrap();
        assert_ne!(with, without);
    }

    #[test]
    fn test_query_order_stays_distinct() {
        let a = normalize_url("/p?x=1&y=2", &base()).unwrap();
        let b = normalize_url("/p?y=2&x=1", &base()).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "https://example.com/p?x=1&y=2");
    }

    #[test]
    fn test_dot_segments_resolved() {
        let result = normalize_url("https://example.com/a/../b/./c", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_reject_mailto() {
        let result = normalize_url("mailto:someone@example.com", &base());
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_reject_javascript() {
        let result = normalize_url("javascript:void(0)", &base());
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_reject_ftp() {
        let result = normalize_url("ftp://example.com/file", &base());
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_reject_empty() {
        assert!(normalize_url("   ", &base()).is_err());
    }

    #[test]
    fn test_parse_seed_adds_https() {
        let seed = parse_seed("example.com").unwrap();
        assert_eq!(seed.as_str(), "https://example.com/");
    }

    #[test]
    fn test_parse_seed_keeps_http() {
        let seed = parse_seed("http://example.com/start#top").unwrap();
        assert_eq!(seed.as_str(), "http://example.com/start");
    }

    #[test]
    fn test_parse_seed_rejects_garbage() {
        assert!(parse_seed("http://").is_err());
        assert!(parse_seed("").is_err());
    }
}
