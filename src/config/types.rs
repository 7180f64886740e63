use serde::Deserialize;

/// Main configuration structure for Driftwatch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub changes: ChangesConfig,
    #[serde(rename = "target", default)]
    pub targets: Vec<TargetEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Page budget for a target's main crawl
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Page budget for each tracking URL crawl
    #[serde(rename = "tracking-max-pages", default = "default_tracking_max_pages")]
    pub tracking_max_pages: usize,

    /// Always scroll pages to the bottom until their height settles
    #[serde(default)]
    pub scroll: bool,

    /// Probe each page with one scroll and only keep scrolling if it grew
    #[serde(rename = "smart-scroll", default = "default_smart_scroll")]
    pub smart_scroll: bool,

    /// Wait after each scroll before measuring the page again (milliseconds)
    #[serde(rename = "scroll-settle-ms", default = "default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,

    /// Hard cap on scroll iterations per page
    #[serde(rename = "max-scroll-iterations", default = "default_max_scroll_iterations")]
    pub max_scroll_iterations: u32,

    /// Per-page load timeout (seconds)
    #[serde(rename = "page-timeout-secs", default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Number of crawl jobs allowed to run at the same time
    #[serde(rename = "max-concurrent-crawls", default = "default_max_concurrent_crawls")]
    pub max_concurrent_crawls: usize,

    /// Which page loader renders pages
    #[serde(default)]
    pub loader: LoaderKind,
}

fn default_tracking_max_pages() -> usize {
    3
}

fn default_smart_scroll() -> bool {
    true
}

fn default_scroll_settle_ms() -> u64 {
    1000
}

fn default_max_scroll_iterations() -> u32 {
    50
}

fn default_page_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_crawls() -> usize {
    4
}

/// Page loader backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    /// Plain HTTP fetch; pages never grow when scrolled
    #[default]
    Http,
    /// Headless Chromium (requires the `browser` feature)
    Browser,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown change report
    #[serde(rename = "report-path")]
    pub report_path: String,
}

/// Change reporting policy
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangesConfig {
    /// What to do with a URL that has no stored snapshot yet
    #[serde(rename = "first-sighting", default)]
    pub first_sighting: FirstSighting,
}

/// Treatment of a URL seen for the first time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirstSighting {
    /// Store the snapshot silently
    #[default]
    Baseline,
    /// Store the snapshot and report the whole page as added
    Report,
}

/// A monitored site
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
    /// Display name, also used to label snapshots and changes
    pub name: String,

    /// Start URL; its host bounds the crawl
    pub url: String,

    /// How the target is crawled
    #[serde(default)]
    pub kind: TargetKind,

    /// Extra pages crawled as their own small jobs (each is its own scope root)
    #[serde(rename = "tracking-urls", default)]
    pub tracking_urls: Vec<String>,
}

/// Kind of a monitored target, resolved once when jobs are planned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Breadth-first crawl with the crawler settings
    #[default]
    Website,
    /// A single feed page, always scrolled to load more posts
    Social,
}
