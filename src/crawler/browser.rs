//! Headless Chromium page loader
//!
//! Drives a single shared browser process. Each [`PageLoader::open`] creates
//! a fresh tab, navigates it, and hands it to the crawler; the tab is closed
//! explicitly since chromiumoxide pages do not release themselves on drop.

use crate::crawler::loader::{LoadedPage, PageLoader, ScrollSurface};
use crate::{CrawlError, FetchError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

const HEIGHT_SCRIPT: &str = "document.documentElement.scrollHeight";
const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.documentElement.scrollHeight)";

/// Loads pages in headless Chromium
pub struct BrowserPageLoader {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    timeout: Duration,
}

impl BrowserPageLoader {
    /// Launches the browser process
    ///
    /// Fails with [`CrawlError::CapabilityInit`] when no Chromium binary can
    /// be found or started.
    pub async fn launch(timeout: Duration) -> Result<Self, CrawlError> {
        let config = BrowserConfig::builder()
            .request_timeout(timeout)
            .build()
            .map_err(CrawlError::CapabilityInit)?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::CapabilityInit(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        tracing::info!("Headless browser launched");

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            timeout,
        })
    }
}

#[async_trait]
impl PageLoader for BrowserPageLoader {
    async fn open(&self, url: &Url) -> Result<Box<dyn LoadedPage>, FetchError> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| render_error(url, e))?
        };

        let navigation = async {
            page.goto(url.as_str()).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        let loaded = with_timeout(self.timeout, url, navigation).await;
        let mut tab = BrowserPage {
            page: Some(page),
            url: url.to_string(),
            final_url: None,
        };

        if let Err(e) = loaded {
            tab.close().await;
            return Err(e);
        }

        tab.final_url = tab.current_url().await;
        Ok(Box::new(tab))
    }

    async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = browser.wait().await {
            tracing::debug!("Browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
    }
}

/// One open browser tab
struct BrowserPage {
    page: Option<Page>,
    url: String,
    final_url: Option<Url>,
}

impl BrowserPage {
    /// Address the tab ended up on after redirects
    async fn current_url(&self) -> Option<Url> {
        let current = self.page.as_ref()?.url().await.ok()??;
        Url::parse(&current).ok()
    }

    fn page(&self) -> Result<&Page, FetchError> {
        self.page.as_ref().ok_or_else(|| FetchError::Render {
            url: self.url.clone(),
            message: "page already closed".to_string(),
        })
    }

    fn render_error(&self, error: impl std::fmt::Display) -> FetchError {
        FetchError::Render {
            url: self.url.clone(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl ScrollSurface for BrowserPage {
    async fn scroll_height(&mut self) -> Result<u64, FetchError> {
        let result = self
            .page()?
            .evaluate(HEIGHT_SCRIPT)
            .await
            .map_err(|e| self.render_error(e))?;
        let height: f64 = result.into_value().map_err(|e| self.render_error(e))?;
        Ok(height.max(0.0) as u64)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), FetchError> {
        self.page()?
            .evaluate(SCROLL_SCRIPT)
            .await
            .map_err(|e| self.render_error(e))?;
        Ok(())
    }
}

#[async_trait]
impl LoadedPage for BrowserPage {
    async fn html(&mut self) -> Result<String, FetchError> {
        self.page()?
            .content()
            .await
            .map_err(|e| self.render_error(e))
    }

    fn final_url(&self) -> Option<&Url> {
        self.final_url.as_ref()
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::warn!("Failed to close page for {}: {}", self.url, e);
            }
        }
    }
}

fn render_error(url: &Url, error: impl std::fmt::Display) -> FetchError {
    FetchError::Render {
        url: url.to_string(),
        message: error.to_string(),
    }
}

async fn with_timeout<F>(timeout: Duration, url: &Url, future: F) -> Result<(), FetchError>
where
    F: Future<Output = Result<(), chromiumoxide::error::CdpError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(render_error(url, e)),
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
        }),
    }
}
