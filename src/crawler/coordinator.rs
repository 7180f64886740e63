//! Crawler coordinator - main crawl loop
//!
//! Breadth-first over a single host:
//! - Dequeue the next frontier URL and mark it visited before loading
//! - Load, settle dynamic content, read the HTML, always close the page
//! - Record the page text and enqueue in-scope links it references, resolved
//!   against the URL the page was finally served from
//! - Stop once `max_pages` pages have been collected or the frontier is empty
//!
//! A page that fails to load is logged and recorded; the crawl carries on
//! with the next URL.

use crate::crawler::loader::PageLoader;
use crate::crawler::parser::parse_html;
use crate::crawler::scroll::{DynamicContentHandler, ScrollReport};
use crate::crawler::session::{CrawlConfig, CrawlOutput, CrawlSession, PageRecord};
use crate::url::{normalize_url, url_in_scope};
use crate::FetchError;
use std::sync::Arc;
use url::Url;

/// Runs crawls against a shared page loader
#[derive(Clone)]
pub struct Crawler {
    loader: Arc<dyn PageLoader>,
}

impl Crawler {
    pub fn new(loader: Arc<dyn PageLoader>) -> Self {
        Self { loader }
    }

    /// Crawls from `config.start_url()` until the page budget is spent
    pub async fn crawl(&self, config: &CrawlConfig) -> CrawlOutput {
        let session = CrawlSession::new(config.start_url().clone());
        self.crawl_session(config, session).await
    }

    /// Crawls with a caller-prepared session
    pub async fn crawl_session(&self, config: &CrawlConfig, mut session: CrawlSession) -> CrawlOutput {
        let handler = DynamicContentHandler::new(*config.scroll());
        let start_time = std::time::Instant::now();

        tracing::info!(
            "Crawling {} (max {} pages, scroll policy {:?})",
            config.start_url(),
            config.max_pages(),
            config.scroll().policy
        );

        while session.page_count() < config.max_pages() {
            let Some(url) = session.next_url() else {
                tracing::debug!("Frontier is empty");
                break;
            };

            tracing::debug!("Processing URL: {}", url);

            match self.load(&url, &handler).await {
                Ok((html, base)) => {
                    let parsed = parse_html(&html);
                    session.record_page(PageRecord::new(url.to_string(), parsed.content));

                    let mut discovered = 0usize;
                    for href in &parsed.links {
                        match normalize_url(href, &base) {
                            Ok(link) if url_in_scope(&link, config.scope_host()) => {
                                if session.enqueue(link) {
                                    discovered += 1;
                                }
                            }
                            Ok(link) => tracing::trace!("Out of scope: {}", link),
                            Err(e) => tracing::trace!("Skipping link {:?}: {}", href, e),
                        }
                    }

                    tracing::debug!(
                        "Visited {} ({} links, {} new)",
                        url,
                        parsed.links.len(),
                        discovered
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", url, e);
                    session.record_failure(&url, e);
                }
            }
        }

        let output = session.into_output();
        tracing::info!(
            "Crawl of {} finished: {} pages, {} failures in {:.2}s",
            output.start_url,
            output.pages.len(),
            output.failures.len(),
            start_time.elapsed().as_secs_f64()
        );
        output
    }

    /// Loads one page and returns its HTML after scrolling, with the URL its
    /// links resolve against
    ///
    /// The page is closed whether or not reading it succeeded.
    async fn load(
        &self,
        url: &Url,
        handler: &DynamicContentHandler,
    ) -> Result<(String, Url), FetchError> {
        let mut page = self.loader.open(url).await?;

        let report: ScrollReport = handler.settle(&mut *page).await;
        tracing::trace!(
            "Settled {} after {} scrolls ({:?})",
            url,
            report.scrolls,
            report.reason
        );

        let html = page.html().await;
        let base = page.final_url().cloned().unwrap_or_else(|| url.clone());
        page.close().await;
        Ok((html?, base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::loader::{LoadedPage, ScrollSurface};
    use crate::crawler::scroll::{ScrollPolicy, ScrollSettings};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves canned HTML by normalized URL
    #[derive(Default)]
    struct FakeLoader {
        pages: HashMap<String, String>,
        redirects: HashMap<String, Url>,
        opened: Mutex<Vec<String>>,
        closed: Arc<AtomicUsize>,
    }

    impl FakeLoader {
        fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        /// Serves `url` as though it had been redirected to `target`
        fn with_redirect(mut self, url: &str, target: &str) -> Self {
            self.redirects
                .insert(url.to_string(), Url::parse(target).unwrap());
            self
        }

        fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    struct FakePage {
        html: String,
        final_url: Option<Url>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PageLoader for FakeLoader {
        async fn open(&self, url: &Url) -> Result<Box<dyn LoadedPage>, FetchError> {
            self.opened.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(html) => Ok(Box::new(FakePage {
                    html: html.clone(),
                    final_url: self.redirects.get(url.as_str()).cloned(),
                    closed: self.closed.clone(),
                })),
                None => Err(FetchError::Http {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    #[async_trait]
    impl ScrollSurface for FakePage {
        async fn scroll_height(&mut self) -> Result<u64, FetchError> {
            Ok(100)
        }

        async fn scroll_to_bottom(&mut self) -> Result<(), FetchError> {
            Ok(())
        }
    }

    #[async_trait]
    impl LoadedPage for FakePage {
        async fn html(&mut self) -> Result<String, FetchError> {
            Ok(self.html.clone())
        }

        fn final_url(&self) -> Option<&Url> {
            self.final_url.as_ref()
        }

        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config(start: &str, max_pages: usize) -> CrawlConfig {
        CrawlConfig::new(start, max_pages).unwrap().with_scroll(ScrollSettings {
            policy: ScrollPolicy::Smart,
            settle: Duration::ZERO,
            max_iterations: 3,
        })
    }

    fn acme_site() -> FakeLoader {
        FakeLoader::default()
            .with_page(
                "https://acme.test/",
                r#"<h1>Welcome</h1><a href="/about">About</a><a href="/pricing/">Pricing</a>"#,
            )
            .with_page(
                "https://acme.test/about",
                r#"<p>About us</p><a href="/">Home</a>"#,
            )
            .with_page("https://acme.test/pricing", r#"<p>$10</p>"#)
    }

    #[tokio::test]
    async fn test_crawl_follows_links_breadth_first() {
        let loader = Arc::new(acme_site());
        let crawler = Crawler::new(loader.clone());

        let output = crawler.crawl(&config("https://acme.test", 10)).await;
        let urls: Vec<&str> = output.pages.iter().map(|p| p.url.as_str()).collect();

        assert_eq!(
            urls,
            vec![
                "https://acme.test/",
                "https://acme.test/about",
                "https://acme.test/pricing"
            ]
        );
        assert_eq!(output.text_map()["https://acme.test/pricing"], "$10");
        assert!(output.failures.is_empty());
        assert_eq!(loader.closed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_crawl_respects_page_budget() {
        let loader = Arc::new(acme_site());
        let output = Crawler::new(loader.clone())
            .crawl(&config("https://acme.test/", 1))
            .await;

        assert_eq!(output.len(), 1);
        assert_eq!(loader.opened(), vec!["https://acme.test/"]);
    }

    #[tokio::test]
    async fn test_zero_budget_loads_nothing() {
        let loader = Arc::new(acme_site());
        let output = Crawler::new(loader.clone())
            .crawl(&config("https://acme.test/", 0))
            .await;

        assert!(output.is_empty());
        assert!(loader.opened().is_empty());
    }

    #[tokio::test]
    async fn test_off_host_and_non_http_links_ignored() {
        let loader = Arc::new(FakeLoader::default().with_page(
            "https://acme.test/",
            r#"
                <a href="https://other.test/x">Other</a>
                <a href="mailto:sales@acme.test">Mail</a>
                <a href="/brochure.pdf">PDF</a>
                <a href="javascript:void(0)">JS</a>
            "#,
        ));
        let output = Crawler::new(loader.clone())
            .crawl(&config("https://acme.test/", 10))
            .await;

        assert_eq!(output.len(), 1);
        assert_eq!(loader.opened(), vec!["https://acme.test/"]);
    }

    #[tokio::test]
    async fn test_failed_page_does_not_stop_crawl() {
        let loader = Arc::new(FakeLoader::default().with_page(
            "https://acme.test/",
            r#"<a href="/missing">Gone</a><a href="/ok">Ok</a>"#,
        )
        .with_page("https://acme.test/ok", "<p>fine</p>"));

        let output = Crawler::new(loader.clone())
            .crawl(&config("https://acme.test/", 10))
            .await;

        assert_eq!(output.len(), 2);
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].url, "https://acme.test/missing");
        // failed pages do not count toward the budget and are not retried
        assert_eq!(loader.opened().len(), 3);
    }

    #[tokio::test]
    async fn test_equivalent_links_visited_once() {
        let loader = Arc::new(FakeLoader::default()
            .with_page(
                "https://acme.test/",
                r#"
                    <a href="/a">A</a>
                    <a href="/a/">A slash</a>
                    <a href="/a#section">A fragment</a>
                    <a href="/a?utm_source=mail">A tracked</a>
                    <a href="./a">A relative</a>
                "#,
            )
            .with_page("https://acme.test/a", r#"<a href="/">Home</a>"#));

        let output = Crawler::new(loader.clone())
            .crawl(&config("https://acme.test/", 10))
            .await;

        assert_eq!(output.len(), 2);
        assert_eq!(
            loader.opened(),
            vec!["https://acme.test/", "https://acme.test/a"]
        );
    }

    #[tokio::test]
    async fn test_relative_links_resolve_against_redirect_target() {
        let loader = Arc::new(
            FakeLoader::default()
                .with_page("https://acme.test/docs", r#"<a href="intro">Intro</a>"#)
                .with_redirect("https://acme.test/docs", "https://acme.test/docs/")
                .with_page("https://acme.test/docs/intro", "<p>Intro</p>"),
        );

        let output = Crawler::new(loader.clone())
            .crawl(&config("https://acme.test/docs/", 10))
            .await;

        let urls: Vec<&str> = output.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://acme.test/docs", "https://acme.test/docs/intro"]);
        assert!(output.failures.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_start_yields_empty_output() {
        let loader = Arc::new(FakeLoader::default());
        let output = Crawler::new(loader)
            .crawl(&config("https://acme.test/", 5))
            .await;

        assert!(output.is_empty());
        assert_eq!(output.failures.len(), 1);
    }
}
