//! Crawl inputs, per-crawl state and results

use crate::content::ExtractedContent;
use crate::crawler::scroll::{ScrollPolicy, ScrollSettings};
use crate::url::{extract_domain, normalize_absolute};
use crate::{FetchError, UrlError, UrlResult};
use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

/// Parameters of one bounded crawl
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    start_url: Url,
    scope_host: String,
    max_pages: usize,
    scroll: ScrollSettings,
}

impl CrawlConfig {
    /// Normalizes `start_url` and derives the scope host from it
    ///
    /// # Example
    ///
    /// ```
    /// use driftwatch::CrawlConfig;
    ///
    /// let config = CrawlConfig::new("https://Acme.test/Docs/#top", 10).unwrap();
    /// assert_eq!(config.start_url().as_str(), "https://acme.test/Docs");
    /// assert_eq!(config.scope_host(), "acme.test");
    /// ```
    pub fn new(start_url: &str, max_pages: usize) -> UrlResult<Self> {
        let start_url = normalize_absolute(start_url)?;
        let scope_host = extract_domain(&start_url).ok_or(UrlError::MissingDomain)?;

        Ok(Self {
            start_url,
            scope_host,
            max_pages,
            scroll: ScrollSettings::default(),
        })
    }

    /// Replaces the scroll settings
    pub fn with_scroll(mut self, scroll: ScrollSettings) -> Self {
        self.scroll = scroll;
        self
    }

    /// Sets the scroll policy from the two crawl flags
    pub fn with_scroll_flags(mut self, scroll: bool, smart_scroll: bool) -> Self {
        self.scroll.policy = ScrollPolicy::from_flags(scroll, smart_scroll);
        self
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    pub fn scope_host(&self) -> &str {
        &self.scope_host
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn scroll(&self) -> &ScrollSettings {
        &self.scroll
    }
}

/// A successfully crawled page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// Normalized URL the page was loaded from
    pub url: String,
    /// Whitespace-normalized visible text
    pub text: String,
    /// SHA-256 hex digest of `text`
    pub content_hash: String,
}

impl PageRecord {
    pub fn new(url: String, content: ExtractedContent) -> Self {
        Self {
            url,
            text: content.text,
            content_hash: content.hash,
        }
    }
}

/// A page that could not be loaded
#[derive(Debug, Clone)]
pub struct PageFailure {
    pub url: String,
    pub error: FetchError,
}

/// Everything a crawl produced
///
/// Pages appear in the order they were visited; the start URL, if it loaded,
/// is always first.
#[derive(Debug, Clone)]
pub struct CrawlOutput {
    pub start_url: Url,
    pub pages: Vec<PageRecord>,
    pub failures: Vec<PageFailure>,
}

impl CrawlOutput {
    /// Normalized URL to visible text
    pub fn text_map(&self) -> HashMap<String, String> {
        self.pages
            .iter()
            .map(|page| (page.url.clone(), page.text.clone()))
            .collect()
    }

    pub fn get(&self, url: &str) -> Option<&PageRecord> {
        self.pages.iter().find(|page| page.url == url)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Frontier and bookkeeping for one crawl
///
/// `visited` holds every normalized URL that has been dequeued for loading,
/// whether or not the load succeeded. `queued` mirrors the frontier so a URL
/// is enqueued at most once while it waits.
#[derive(Debug)]
pub struct CrawlSession {
    start_url: Url,
    frontier: VecDeque<Url>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    pages: Vec<PageRecord>,
    failures: Vec<PageFailure>,
}

impl CrawlSession {
    pub fn new(start_url: Url) -> Self {
        let mut queued = HashSet::new();
        queued.insert(start_url.to_string());

        let mut frontier = VecDeque::new();
        frontier.push_back(start_url.clone());

        Self {
            start_url,
            frontier,
            queued,
            visited: HashSet::new(),
            pages: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Pops the next unvisited URL and marks it visited
    pub fn next_url(&mut self) -> Option<Url> {
        while let Some(url) = self.frontier.pop_front() {
            let key = url.to_string();
            self.queued.remove(&key);

            if self.visited.insert(key) {
                return Some(url);
            }
        }
        None
    }

    /// Adds a normalized URL to the frontier
    ///
    /// Returns `false` if it was already visited or waiting.
    pub fn enqueue(&mut self, url: Url) -> bool {
        let key = url.to_string();
        if self.visited.contains(&key) || self.queued.contains(&key) {
            return false;
        }
        self.queued.insert(key);
        self.frontier.push_back(url);
        true
    }

    pub fn record_page(&mut self, page: PageRecord) {
        self.pages.push(page);
    }

    pub fn record_failure(&mut self, url: &Url, error: FetchError) {
        self.failures.push(PageFailure {
            url: url.to_string(),
            error,
        });
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn into_output(self) -> CrawlOutput {
        CrawlOutput {
            start_url: self.start_url,
            pages: self.pages,
            failures: self.failures,
        }
    }
}
