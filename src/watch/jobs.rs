//! Crawl job planning
//!
//! Every target becomes one main crawl plus one small crawl per tracking URL.
//! Each job is its own scope root: a tracking URL on another host is crawled
//! within that host, not the target's.

use crate::config::{Config, TargetEntry, TargetKind};
use crate::crawler::{CrawlConfig, ScrollPolicy, ScrollSettings};
use crate::UrlResult;

/// What a job crawls for its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobRole {
    /// The target's own URL
    Main,
    /// One of the target's tracking URLs
    Tracking,
}

/// One crawl to run during a watch
#[derive(Debug, Clone)]
pub struct CrawlJob {
    /// Name of the target the job belongs to
    pub target: String,
    pub role: JobRole,
    pub crawl: CrawlConfig,
}

/// Builds the jobs for every configured target, in configuration order
///
/// Social targets crawl only their landing page and always scroll it, since
/// feeds load entries as the reader scrolls.
pub fn build_jobs(config: &Config) -> UrlResult<Vec<CrawlJob>> {
    let scroll = ScrollSettings::from_config(&config.crawler);
    let mut jobs = Vec::new();

    for target in &config.targets {
        jobs.push(main_job(target, config, scroll)?);

        for tracking_url in &target.tracking_urls {
            jobs.push(CrawlJob {
                target: target.name.clone(),
                role: JobRole::Tracking,
                crawl: CrawlConfig::new(tracking_url, config.crawler.tracking_max_pages)?
                    .with_scroll(scroll),
            });
        }
    }

    Ok(jobs)
}

fn main_job(target: &TargetEntry, config: &Config, scroll: ScrollSettings) -> UrlResult<CrawlJob> {
    let crawl = match target.kind {
        TargetKind::Website => {
            CrawlConfig::new(&target.url, config.crawler.max_pages)?.with_scroll(scroll)
        }
        TargetKind::Social => CrawlConfig::new(&target.url, 1)?
            .with_scroll(scroll.with_policy(ScrollPolicy::Always)),
    };

    Ok(CrawlJob {
        target: target.name.clone(),
        role: JobRole::Main,
        crawl,
    })
}
