use url::Url;

/// File extensions that never hold a crawlable document
const NON_DOCUMENT_EXTENSIONS: &[&str] = &[
    // Images
    "png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "bmp", "tif", "tiff", "avif",
    // Archives and binaries
    "zip", "tar", "gz", "tgz", "bz2", "xz", "rar", "7z", "exe", "dmg", "msi", "apk", "iso",
    // Office documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "csv", "rtf",
    // Audio
    "mp3", "wav", "ogg", "flac", "aac", "m4a",
    // Video
    "mp4", "m4v", "avi", "mov", "mkv", "webm", "wmv", "flv",
    // Assets
    "css", "js", "json", "xml", "woff", "woff2", "ttf", "otf", "eot",
];

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use driftwatch::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Decides whether a URL may be followed during a single-domain crawl
///
/// Rejects non-HTTP(S) schemes, hosts other than `scope_host`, and paths that
/// end in a known non-document extension. Anything that fails to parse is
/// out of scope.
///
/// # Examples
///
/// ```
/// use driftwatch::url::in_scope;
///
/// assert!(in_scope("https://example.com/pricing", "example.com"));
/// assert!(!in_scope("https://other.com/pricing", "example.com"));
/// assert!(!in_scope("mailto:info@example.com", "example.com"));
/// assert!(!in_scope("https://example.com/brochure.pdf", "example.com"));
/// ```
pub fn in_scope(url: &str, scope_host: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    url_in_scope(&parsed, scope_host)
}

/// [`in_scope`] for an already parsed URL
pub fn url_in_scope(url: &Url, scope_host: &str) -> bool {
    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    match extract_domain(url) {
        Some(host) if host.eq_ignore_ascii_case(scope_host) => {}
        _ => return false,
    }

    !has_non_document_extension(url)
}

fn has_non_document_extension(url: &Url) -> bool {
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            NON_DOCUMENT_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}
