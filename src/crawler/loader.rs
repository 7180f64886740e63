//! Page loading capability
//!
//! A [`PageLoader`] opens one URL at a time and hands back a [`LoadedPage`]
//! the crawler can measure, scroll, read and close. The HTTP loader serves
//! static pages; the browser loader (feature `browser`) drives a real
//! headless Chromium tab.

use crate::config::{CrawlerConfig, LoaderKind, UserAgentConfig};
use crate::crawler::fetcher::HttpPageLoader;
use crate::{CrawlError, FetchError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Opens pages for the crawler
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Loads `url` and waits for navigation to finish
    async fn open(&self, url: &Url) -> Result<Box<dyn LoadedPage>, FetchError>;

    /// Releases any process or connection held by the loader
    async fn shutdown(&self) {}
}

/// Something whose rendered height can be measured and scrolled
#[async_trait]
pub trait ScrollSurface: Send {
    /// Current scrollable height of the document
    async fn scroll_height(&mut self) -> Result<u64, FetchError>;

    /// Scrolls the viewport to the bottom of the document
    async fn scroll_to_bottom(&mut self) -> Result<(), FetchError>;
}

/// An open page
#[async_trait]
pub trait LoadedPage: ScrollSurface {
    /// Serialized HTML of the page as currently rendered
    async fn html(&mut self) -> Result<String, FetchError>;

    /// URL the document was actually served from, after redirects
    ///
    /// Relative links on the page resolve against this. `None` means the
    /// requested URL.
    fn final_url(&self) -> Option<&Url> {
        None
    }

    /// Releases the page; called exactly once, on success and on failure
    async fn close(&mut self);
}

/// Builds the loader selected by `[crawler] loader`
pub async fn build_loader(
    settings: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<Arc<dyn PageLoader>, CrawlError> {
    let timeout = Duration::from_secs(settings.page_timeout_secs);

    match settings.loader {
        LoaderKind::Http => {
            let loader: Arc<dyn PageLoader> = Arc::new(HttpPageLoader::new(user_agent, timeout)?);
            Ok(loader)
        }
        LoaderKind::Browser => launch_browser(timeout).await,
    }
}

#[cfg(feature = "browser")]
async fn launch_browser(timeout: Duration) -> Result<Arc<dyn PageLoader>, CrawlError> {
    let loader: Arc<dyn PageLoader> =
        Arc::new(crate::crawler::browser::BrowserPageLoader::launch(timeout).await?);
    Ok(loader)
}

#[cfg(not(feature = "browser"))]
async fn launch_browser(_timeout: Duration) -> Result<Arc<dyn PageLoader>, CrawlError> {
    Err(CrawlError::CapabilityInit(
        "browser loader requested but driftwatch was built without the `browser` feature"
            .to_string(),
    ))
}
