//! Change detection between snapshots and freshly crawled pages
//!
//! This module holds:
//! - The hash-gated comparison that produces a `ChangeRecord`
//! - A line-based unified diff built on a longest-common-subsequence table

mod detector;
mod diff;

pub use detector::{detect, ChangeRecord};
pub use diff::{unified_diff, DEFAULT_CONTEXT};
