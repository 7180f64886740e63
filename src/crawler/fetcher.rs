//! HTTP page loader
//!
//! This module handles plain HTTP loading for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Content-Type checks
//! - Error classification
//!
//! Pages loaded over HTTP are static: their height never changes, so the
//! scroll handler settles on them after a single probe.

use crate::config::UserAgentConfig;
use crate::crawler::loader::{LoadedPage, PageLoader, ScrollSurface};
use crate::{CrawlError, FetchError};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use driftwatch::config::UserAgentConfig;
/// use driftwatch::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "Driftwatch".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// An HTML response body and the URL it came from
#[derive(Debug, Clone)]
pub struct FetchedHtml {
    /// Response URL after following redirects
    pub final_url: Url,
    pub body: String,
}

/// Fetches a URL and returns its HTML body
///
/// # Error mapping
///
/// | Condition | Error |
/// |-----------|-------|
/// | Non-2xx status | `FetchError::Http` |
/// | Timeout | `FetchError::Timeout` |
/// | Connection or body failure | `FetchError::Network` |
/// | Content-Type other than HTML | `FetchError::ContentMismatch` |
///
/// A missing Content-Type header is treated as HTML.
pub async fn fetch_html(client: &Client, url: &Url) -> Result<FetchedHtml, FetchError> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html_content_type(&content_type) {
        return Err(FetchError::ContentMismatch {
            url: url.to_string(),
            content_type,
        });
    }

    let final_url = response.url().clone();
    let body = response.text().await.map_err(|e| classify_error(url, e))?;
    Ok(FetchedHtml { final_url, body })
}

fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}

fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Loads pages with a plain HTTP GET
pub struct HttpPageLoader {
    client: Client,
}

impl HttpPageLoader {
    /// Creates a loader whose requests give up after `timeout`
    pub fn new(user_agent: &UserAgentConfig, timeout: Duration) -> Result<Self, CrawlError> {
        let client = build_http_client(user_agent, timeout)
            .map_err(|e| CrawlError::CapabilityInit(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    async fn open(&self, url: &Url) -> Result<Box<dyn LoadedPage>, FetchError> {
        let fetched = fetch_html(&self.client, url).await?;
        if fetched.final_url != *url {
            tracing::debug!("{} redirected to {}", url, fetched.final_url);
        }
        Ok(Box::new(StaticPage {
            body: fetched.body,
            final_url: fetched.final_url,
        }))
    }
}

/// A fetched document that cannot grow
struct StaticPage {
    body: String,
    final_url: Url,
}

#[async_trait]
impl ScrollSurface for StaticPage {
    async fn scroll_height(&mut self) -> Result<u64, FetchError> {
        Ok(self.body.len() as u64)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), FetchError> {
        Ok(())
    }
}

#[async_trait]
impl LoadedPage for StaticPage {
    async fn html(&mut self) -> Result<String, FetchError> {
        Ok(self.body.clone())
    }

    fn final_url(&self) -> Option<&Url> {
        Some(&self.final_url)
    }

    async fn close(&mut self) {}
}
