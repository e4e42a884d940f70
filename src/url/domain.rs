use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_scrape::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Reduces a host to the domain used for same-site comparisons
///
/// A leading `www.` is dropped so that `www.example.com` and `example.com`
/// count as the same site. Other subdomains are kept as-is.
///
/// # Examples
///
/// ```
/// use sumi_scrape::url::registered_domain;
///
/// assert_eq!(registered_domain("WWW.Example.com"), "example.com");
/// assert_eq!(registered_domain("blog.example.com"), "blog.example.com");
/// ```
pub fn registered_domain(host: &str) -> String {
    let host = host.to_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    }
}

/// Returns true if `url` lives on the site identified by `site_domain`
///
/// `site_domain` must already be reduced with [`registered_domain`].
/// Ports are not part of the comparison.
pub fn is_same_site(url: &Url, site_domain: &str) -> bool {
    extract_domain(url)
        .map(|host| registered_domain(&host) == site_domain)
        .unwrap_or(false)
}
