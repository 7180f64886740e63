use crate::{UrlError, UrlResult};
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Resolves `raw` against `base` and normalizes the result
///
/// The output is the canonical identity of a page: the crawler keys its
/// visited set, its result map and the snapshot store by it.
///
/// # Normalization Steps
///
/// 1. Resolve `raw` against `base` (absolute URLs ignore the base)
/// 2. Reject anything that is not `http` or `https`
/// 3. Require a host (lowercased by the parser)
/// 4. Normalize path:
///    - Remove dot segments and empty segments
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters
/// 7. Sort remaining query parameters alphabetically
/// 8. Remove empty query string (trailing ?)
///
/// Normalization is idempotent: feeding the output back in with any base
/// returns the same URL.
///
/// # Examples
///
/// ```
/// use driftwatch::url::normalize_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/intro").unwrap();
/// let url = normalize_url("../pricing/#plans", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/pricing");
/// ```
pub fn normalize_url(raw: &str, base: &Url) -> UrlResult<Url> {
    let url = base
        .join(raw.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    canonicalize(url)
}

/// Normalizes an absolute URL such as a configured seed
///
/// # Examples
///
/// ```
/// use driftwatch::url::normalize_absolute;
///
/// let url = normalize_absolute("https://EXAMPLE.com/page/?b=2&a=1").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page?a=1&b=2");
/// ```
pub fn normalize_absolute(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    canonicalize(url)
}

fn canonicalize(mut url: Url) -> UrlResult<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
