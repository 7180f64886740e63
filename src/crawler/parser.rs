//! HTML parser for page content and outgoing links
//!
//! Each loaded page is parsed once; the same document yields the visible
//! text that gets snapshotted and the raw anchor targets that feed the
//! frontier.

use crate::content::{document_text, ExtractedContent};
use scraper::{Html, Selector};

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Visible text and its digest
    pub content: ExtractedContent,

    /// Raw `href` values of every anchor, in document order
    pub links: Vec<String>,
}

/// Parses HTML content and extracts text and links
///
/// Links are returned unresolved. Resolution, normalization and scope
/// checks happen in the crawler against the URL the page was loaded from,
/// which is also where `mailto:`, `javascript:` and friends are rejected.
///
/// # Example
///
/// ```
/// use driftwatch::crawler::parse_html;
///
/// let html = r#"<html><body><p>Hi</p><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.links, vec!["/page".to_string()]);
/// assert_eq!(parsed.content.text, "Hi Link");
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        content: ExtractedContent::from_text(document_text(&document)),
        links: extract_links(&document),
    }
}

/// Extracts every non-empty anchor href from the document
fn extract_links(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}
