//! Driftwatch: a bounded site crawler with content change detection
//!
//! This crate crawls a single domain breadth-first, extracts stable visible
//! text from every page it reaches, and compares that text against the last
//! persisted snapshot to produce a hash-gated unified diff.

pub mod change;
pub mod config;
pub mod content;
pub mod crawler;
pub mod output;
pub mod storage;
pub mod url;
pub mod watch;

use thiserror::Error;

/// Main error type for Driftwatch operations
#[derive(Debug, Error)]
pub enum DriftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Crawl task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
///
/// A URL that fails normalization is never crawled; these errors stay inside
/// the crawler and are logged at debug level.
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Job-level crawl failures
///
/// Per-page problems are [`FetchError`]s and never surface here; a crawl
/// only aborts when its page-loading capability cannot start.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Page loader failed to initialize: {0}")]
    CapabilityInit(String),

    #[error("Crawl job scheduler closed")]
    SchedulerClosed,
}

/// Per-page load failures
///
/// A crawl records these and moves on to the next frontier entry.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Expected HTML from {url}, got {content_type}")]
    ContentMismatch { url: String, content_type: String },

    #[error("Render error for {url}: {message}")]
    Render { url: String, message: String },
}

impl FetchError {
    /// The URL the failed load was attempting
    pub fn url(&self) -> &str {
        match self {
            Self::Http { url, .. }
            | Self::Timeout { url }
            | Self::Network { url, .. }
            | Self::ContentMismatch { url, .. }
            | Self::Render { url, .. } => url,
        }
    }
}

/// Result type alias for Driftwatch operations
pub type Result<T> = std::result::Result<T, DriftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use change::{detect, ChangeRecord};
pub use config::Config;
pub use content::{extract_content, ExtractedContent};
pub use crawler::{crawl, CrawlConfig, CrawlOutput, Crawler, PageRecord};
pub use storage::Snapshot;
pub use url::{in_scope, normalize_url};
