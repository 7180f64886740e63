use crate::change::diff::{unified_diff, DEFAULT_CONTEXT};
use crate::crawler::PageRecord;
use crate::storage::Snapshot;

/// Outcome of comparing one page against its previous snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Normalized URL of the page
    pub url: String,

    /// Content hash from the previous snapshot
    pub previous_hash: String,

    /// Content hash of the current page
    pub new_hash: String,

    /// Unified diff from the previous text to the current text, empty when unchanged
    pub diff: String,

    /// Whether the two hashes differ
    pub changed: bool,
}

/// Compares a page against the last snapshot of the same URL
///
/// The hashes decide: equal hashes yield `changed == false` and an empty diff
/// without looking at the text. Differing hashes produce a unified diff of
/// `previous.raw_text` against `current.text`.
///
/// A URL seen for the first time has no snapshot; what that means is up to
/// the caller, so this function only ever compares two observations.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use driftwatch::change::detect;
/// use driftwatch::content::extract_content;
/// use driftwatch::crawler::PageRecord;
/// use driftwatch::storage::Snapshot;
///
/// let old = extract_content("<p>Pro plan: $20</p>");
/// let new = extract_content("<p>Pro plan: $25</p>");
/// let previous = Snapshot {
///     url: "https://example.com/pricing".to_string(),
///     content_hash: old.hash,
///     raw_text: old.text,
///     taken_at: Utc::now(),
/// };
/// let current = PageRecord::new("https://example.com/pricing".to_string(), new);
///
/// let record = detect(&previous, &current);
/// assert!(record.changed);
/// assert!(record.diff.contains("-Pro plan: $20"));
/// assert!(record.diff.contains("+Pro plan: $25"));
/// ```
pub fn detect(previous: &Snapshot, current: &PageRecord) -> ChangeRecord {
    let changed = previous.content_hash != current.content_hash;

    let diff = if changed {
        unified_diff(&previous.raw_text, &current.text, DEFAULT_CONTEXT)
    } else {
        String::new()
    };

    ChangeRecord {
        url: current.url.clone(),
        previous_hash: previous.content_hash.clone(),
        new_hash: current.content_hash.clone(),
        diff,
        changed,
    }
}
