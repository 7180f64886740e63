//! Crawler module for bounded single-host crawls
//!
//! This module contains the core crawling logic, including:
//! - Page loading over HTTP or through a headless browser
//! - Scrolling dynamic pages until their content settles
//! - HTML parsing and link extraction
//! - Breadth-first frontier management within one host

#[cfg(feature = "browser")]
mod browser;
mod coordinator;
mod fetcher;
mod loader;
mod parser;
mod scroll;
mod session;

#[cfg(feature = "browser")]
pub use browser::BrowserPageLoader;
pub use coordinator::Crawler;
pub use fetcher::{build_http_client, fetch_html, FetchedHtml, HttpPageLoader};
pub use loader::{build_loader, LoadedPage, PageLoader, ScrollSurface};
pub use parser::{parse_html, ParsedPage};
pub use scroll::{
    DynamicContentHandler, ScrollPolicy, ScrollReport, ScrollSettings, ScrollState, StableReason,
};
pub use session::{CrawlConfig, CrawlOutput, CrawlSession, PageFailure, PageRecord};

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::CrawlError;

/// Runs a single crawl with a loader built from configuration
///
/// This is the standalone entry point: it starts the configured page loader,
/// crawls from `config.start_url()`, and shuts the loader down again.
///
/// Individual page failures never abort the crawl; they are reported in
/// [`CrawlOutput::failures`].
///
/// # Errors
///
/// * `CrawlError::CapabilityInit` - The page loader could not be started
pub async fn crawl(
    config: &CrawlConfig,
    settings: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<CrawlOutput, CrawlError> {
    let loader = build_loader(settings, user_agent).await?;
    let output = Crawler::new(loader.clone()).crawl(config).await;
    loader.shutdown().await;
    Ok(output)
}
