use scraper::{Html, Node};
use sha2::{Digest, Sha256};

/// Elements whose contents never count as visible text
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text of a page together with its digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Visible text, whitespace runs collapsed to single spaces
    pub text: String,

    /// Lowercase hex SHA-256 of the UTF-8 bytes of `text`
    pub hash: String,
}

impl ExtractedContent {
    /// Hashes already extracted text
    pub fn from_text(text: String) -> Self {
        let hash = hash_content(&text);
        Self { text, hash }
    }
}

/// Extracts visible text from HTML and hashes it
///
/// # Examples
///
/// ```
/// use driftwatch::content::extract_content;
///
/// let a = extract_content("<p>Plans   start at <b>$9</b></p><script>track()</script>");
/// let b = extract_content("<p>Plans start at\n<b>$9</b></p>");
/// assert_eq!(a.text, "Plans start at $9");
/// assert_eq!(a.hash, b.hash);
/// ```
pub fn extract_content(html: &str) -> ExtractedContent {
    ExtractedContent::from_text(extract_text(html))
}

/// Extracts the visible text of an HTML document
///
/// Comments and the contents of script, style, noscript and template
/// elements are dropped. Every text node is separated from its neighbours
/// by a space so that adjacent elements never run together, then all
/// whitespace runs collapse to a single space and the ends are trimmed.
pub fn extract_text(html: &str) -> String {
    document_text(&Html::parse_document(html))
}

/// Visible text of an already parsed document
///
/// Same rules as [`extract_text`].
pub fn document_text(document: &Html) -> String {
    let mut fragments: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| INVISIBLE_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            fragments.push(text);
        }
    }

    collapse_whitespace(&fragments.join(" "))
}

/// Computes the lowercase hex SHA-256 digest of text
pub fn hash_content(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
