use url::Url;

/// Normalizes a URL into the key used for deduplication within one crawl
///
/// # Normalization Steps
///
/// 1. Parse the URL; absolute `http`/`https` only
/// 2. Scheme and host are lowercased and default ports elided by the parser
/// 3. Keep the origin and the path
/// 4. Remove every trailing slash (the root path collapses to the bare origin)
/// 5. Drop the query string and fragment
///
/// The original URL is never replaced by its key: fetches still use the raw URL,
/// query string included.
///
/// # Returns
///
/// * `Some(String)` - The dedup key
/// * `None` - The input is not an absolute http(s) URL with a host
///
/// # Examples
///
/// ```
/// use sitegrove::url::normalize_url;
///
/// assert_eq!(normalize_url("https://a.com/x/?ref=1#top").as_deref(), Some("https://a.com/x"));
/// assert_eq!(normalize_url("https://A.com/").as_deref(), Some("https://a.com"));
/// assert_eq!(normalize_url("/relative"), None);
/// ```
pub fn normalize_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    normalize_parsed(&url)
}

/// Same as [`normalize_url`] for an already parsed URL
pub fn normalize_parsed(url: &Url) -> Option<String> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str()?;

    let origin = url.origin().ascii_serialization();
    let path = url.path().trim_end_matches('/');

    Some(format!("{}{}", origin, path))
}
