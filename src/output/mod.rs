//! Output module for watch reports and statistics
//!
//! This module handles:
//! - Generating markdown reports of watch runs and their diffs
//! - Loading and printing database statistics

mod markdown;
pub mod stats;

pub use markdown::{format_change_report, generate_change_report};
pub use stats::{load_statistics, print_statistics, WatchStatistics};

use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
