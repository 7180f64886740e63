//! Content extraction and hashing
//!
//! Turns rendered HTML into the whitespace-normalized visible text that
//! snapshots store, and the SHA-256 digest that gates change detection.

mod extract;

pub use extract::{document_text, extract_content, extract_text, hash_content, ExtractedContent};
