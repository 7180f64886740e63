//! Watch runs: crawl every target, diff against stored snapshots, persist
//!
//! A watch run is a thin caller of the crawler and the change detector:
//! - Plan crawl jobs from the configured targets
//! - Run the jobs concurrently, bounded by `max-concurrent-crawls`
//! - Compare every crawled page with its last snapshot
//! - Record changes, upsert snapshots, and summarize per target

mod jobs;

pub use jobs::{build_jobs, CrawlJob, JobRole};

use crate::change::{detect, ChangeRecord};
use crate::config::{Config, FirstSighting};
use crate::content::hash_content;
use crate::crawler::{CrawlOutput, Crawler, PageFailure, PageLoader, PageRecord};
use crate::storage::{RunStatus, Snapshot, Storage, StorageError, StorageResult};
use crate::{CrawlError, DriftError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// What happened to one crawled page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// First sighting stored without a change
    Baselined,
    /// First sighting reported as a change from empty text
    FirstSighting(ChangeRecord),
    /// Same hash as the stored snapshot
    Unchanged,
    /// Content differs from the stored snapshot
    Changed(ChangeRecord),
}

/// Results for one target across all its jobs
#[derive(Debug, Clone, Default)]
pub struct TargetReport {
    pub name: String,
    pub pages_crawled: usize,
    pub baselined: usize,
    pub unchanged: usize,
    pub changes: Vec<ChangeRecord>,
    /// URLs among `changes` that were seen for the first time
    pub first_sightings: Vec<String>,
    pub failures: Vec<PageFailure>,
}

impl TargetReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn absorb(&mut self, job: JobResult) {
        self.pages_crawled += job.pages_crawled;
        self.baselined += job.baselined;
        self.unchanged += job.unchanged;
        self.changes.extend(job.changes);
        self.first_sightings.extend(job.first_sightings);
        self.failures.extend(job.failures);
    }

    /// Whether the change for `url` is a first sighting
    pub fn is_first_sighting(&self, url: &str) -> bool {
        self.first_sightings.iter().any(|u| u == url)
    }
}

/// Summary of a whole watch run
#[derive(Debug, Clone)]
pub struct WatchReport {
    pub run_id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per configured target, in configuration order
    pub targets: Vec<TargetReport>,
}

impl WatchReport {
    pub fn total_changes(&self) -> usize {
        self.targets.iter().map(|t| t.changes.len()).sum()
    }

    pub fn total_pages(&self) -> usize {
        self.targets.iter().map(|t| t.pages_crawled).sum()
    }
}

#[derive(Debug, Default)]
struct JobResult {
    target: String,
    pages_crawled: usize,
    baselined: usize,
    unchanged: usize,
    changes: Vec<ChangeRecord>,
    first_sightings: Vec<String>,
    failures: Vec<PageFailure>,
}

/// Runs one watch over every configured target
///
/// Creates a run record, crawls all jobs, and marks the run completed, or
/// failed if any job could not finish.
pub async fn run_watch<S>(
    config: &Config,
    config_hash: &str,
    loader: Arc<dyn PageLoader>,
    storage: Arc<Mutex<S>>,
) -> Result<WatchReport>
where
    S: Storage + Send + 'static,
{
    let started_at = Utc::now();
    let run_id = lock(&storage)?.create_run(config_hash)?;
    tracing::info!("Starting watch run {}", run_id);

    match execute_jobs(config, run_id, loader, storage.clone()).await {
        Ok(targets) => {
            lock(&storage)?.complete_run(run_id)?;
            let report = WatchReport {
                run_id,
                started_at,
                finished_at: Utc::now(),
                targets,
            };
            tracing::info!(
                "Watch run {} complete: {} pages, {} changes",
                run_id,
                report.total_pages(),
                report.total_changes()
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!("Watch run {} failed: {}", run_id, e);
            if let Err(status_err) = lock(&storage)
                .and_then(|mut store| store.update_run_status(run_id, RunStatus::Failed))
            {
                tracing::warn!("Could not mark run {} failed: {}", run_id, status_err);
            }
            Err(e)
        }
    }
}

async fn execute_jobs<S>(
    config: &Config,
    run_id: i64,
    loader: Arc<dyn PageLoader>,
    storage: Arc<Mutex<S>>,
) -> Result<Vec<TargetReport>>
where
    S: Storage + Send + 'static,
{
    let jobs = build_jobs(config)?;
    let mut reports: Vec<TargetReport> = config
        .targets
        .iter()
        .map(|target| TargetReport::new(&target.name))
        .collect();

    tracing::info!(
        "Planned {} crawl jobs for {} targets",
        jobs.len(),
        reports.len()
    );

    let semaphore = Arc::new(Semaphore::new(config.crawler.max_concurrent_crawls));
    let crawler = Crawler::new(loader);
    let first_sighting = config.changes.first_sighting;
    let recorded = Arc::new(Mutex::new(HashSet::<String>::new()));
    let mut tasks = JoinSet::new();

    for job in jobs {
        let semaphore = semaphore.clone();
        let crawler = crawler.clone();
        let storage = storage.clone();
        let recorded = recorded.clone();

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| CrawlError::SchedulerClosed)?;

            let output = crawler.crawl(&job.crawl).await;
            let mut store = lock(&storage)?;
            let mut recorded = lock(&recorded)?;
            record_output(
                &mut *store,
                &mut *recorded,
                run_id,
                &job.target,
                output,
                first_sighting,
            )
            .map_err(DriftError::from)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let job = joined??;
        if let Some(report) = reports.iter_mut().find(|r| r.name == job.target) {
            report.absorb(job);
        }
    }

    Ok(reports)
}

/// Compares and persists every page of one crawl
///
/// `recorded` holds the URLs already handled in this run; a page another job
/// reached first is skipped so it is compared and counted once.
fn record_output<S>(
    store: &mut S,
    recorded: &mut HashSet<String>,
    run_id: i64,
    target: &str,
    output: CrawlOutput,
    first_sighting: FirstSighting,
) -> StorageResult<JobResult>
where
    S: Storage + ?Sized,
{
    let mut result = JobResult {
        target: target.to_string(),
        failures: output.failures,
        ..Default::default()
    };

    for page in &output.pages {
        if !recorded.insert(page.url.clone()) {
            tracing::debug!("Already recorded {} in this run", page.url);
            continue;
        }

        result.pages_crawled += 1;
        match record_page(store, run_id, target, page, first_sighting, Utc::now())? {
            PageOutcome::Baselined => result.baselined += 1,
            PageOutcome::Unchanged => result.unchanged += 1,
            PageOutcome::FirstSighting(change) => {
                result.first_sightings.push(change.url.clone());
                result.changes.push(change);
            }
            PageOutcome::Changed(change) => result.changes.push(change),
        }
    }

    Ok(result)
}

/// Compares one page with its stored snapshot and persists the outcome
///
/// The snapshot is upserted on every call, changed or not. A change record
/// is stored only when the content hash differs, in the same transaction.
///
/// Under [`FirstSighting::Report`] a new page is diffed against empty text;
/// a new page whose text is itself empty is baselined.
pub fn record_page<S>(
    store: &mut S,
    run_id: i64,
    target: &str,
    page: &PageRecord,
    first_sighting: FirstSighting,
    now: DateTime<Utc>,
) -> StorageResult<PageOutcome>
where
    S: Storage + ?Sized,
{
    let outcome = match store.get_snapshot(&page.url)? {
        Some(previous) => outcome_of(detect(&previous, page)),
        None => match first_sighting {
            FirstSighting::Baseline => {
                tracing::debug!("Baselined {}", page.url);
                PageOutcome::Baselined
            }
            FirstSighting::Report => {
                let empty = Snapshot {
                    url: page.url.clone(),
                    content_hash: hash_content(""),
                    raw_text: String::new(),
                    taken_at: now,
                };
                let change = detect(&empty, page);
                if change.changed {
                    PageOutcome::FirstSighting(change)
                } else {
                    PageOutcome::Baselined
                }
            }
        },
    };

    let change = match &outcome {
        PageOutcome::Changed(change) | PageOutcome::FirstSighting(change) => Some(change),
        PageOutcome::Baselined | PageOutcome::Unchanged => None,
    };

    store.record_observation(
        run_id,
        target,
        &Snapshot {
            url: page.url.clone(),
            content_hash: page.content_hash.clone(),
            raw_text: page.text.clone(),
            taken_at: now,
        },
        change,
    )?;

    if change.is_some() {
        tracing::info!("Change detected on {}", page.url);
    }

    Ok(outcome)
}

fn outcome_of(change: ChangeRecord) -> PageOutcome {
    if change.changed {
        PageOutcome::Changed(change)
    } else {
        PageOutcome::Unchanged
    }
}

fn lock<T>(shared: &Mutex<T>) -> StorageResult<MutexGuard<'_, T>> {
    shared.lock().map_err(|_| StorageError::LockPoisoned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::extract_content;
    use crate::storage::{SnapshotStore, SqliteStorage};

    fn page(url: &str, html: &str) -> PageRecord {
        PageRecord::new(url.to_string(), extract_content(html))
    }

    fn storage_with_run() -> (SqliteStorage, i64) {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash").unwrap();
        (storage, run_id)
    }

    #[test]
    fn test_first_sighting_baseline() {
        let (mut storage, run_id) = storage_with_run();
        let current = page("https://acme.test/", "<p>Hello</p>");

        let outcome = record_page(
            &mut storage,
            run_id,
            "Acme",
            &current,
            FirstSighting::Baseline,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(outcome, PageOutcome::Baselined);
        let stored = storage.get_snapshot("https://acme.test/").unwrap().unwrap();
        assert_eq!(stored.content_hash, current.content_hash);
        assert_eq!(stored.raw_text, "Hello");
        assert_eq!(storage.count_changes().unwrap(), 0);
    }

    #[test]
    fn test_first_sighting_report() {
        let (mut storage, run_id) = storage_with_run();
        let current = page("https://acme.test/", "<p>Hello</p>");

        let outcome = record_page(
            &mut storage,
            run_id,
            "Acme",
            &current,
            FirstSighting::Report,
            Utc::now(),
        )
        .unwrap();

        let PageOutcome::FirstSighting(change) = outcome else {
            panic!("expected a first sighting, got {:?}", outcome);
        };
        assert_eq!(change.previous_hash, hash_content(""));
        assert!(change.diff.contains("+Hello"));
        assert_eq!(storage.count_changes().unwrap(), 1);
    }

    #[test]
    fn test_first_sighting_report_of_empty_page() {
        let (mut storage, run_id) = storage_with_run();
        let current = page("https://acme.test/blank", "<div></div>");

        let outcome = record_page(
            &mut storage,
            run_id,
            "Acme",
            &current,
            FirstSighting::Report,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(outcome, PageOutcome::Baselined);
        assert_eq!(storage.count_changes().unwrap(), 0);
        assert!(storage
            .get_snapshot("https://acme.test/blank")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_page_reached_by_two_jobs_recorded_once() {
        let (mut storage, run_id) = storage_with_run();
        let mut recorded = HashSet::new();
        let start = url::Url::parse("https://acme.test/").unwrap();
        let output = |pages: Vec<PageRecord>| CrawlOutput {
            start_url: start.clone(),
            pages,
            failures: Vec::new(),
        };

        let main = record_output(
            &mut storage,
            &mut recorded,
            run_id,
            "Acme",
            output(vec![
                page("https://acme.test/", "<p>Home</p>"),
                page("https://acme.test/careers", "<p>Careers</p>"),
            ]),
            FirstSighting::Report,
        )
        .unwrap();
        let tracking = record_output(
            &mut storage,
            &mut recorded,
            run_id,
            "Acme",
            output(vec![
                page("https://acme.test/careers", "<p>Careers</p>"),
                page("https://acme.test/careers/eng", "<p>Eng</p>"),
            ]),
            FirstSighting::Report,
        )
        .unwrap();

        assert_eq!(main.pages_crawled, 2);
        assert_eq!(tracking.pages_crawled, 1);
        assert_eq!(tracking.changes.len(), 1);
        assert_eq!(tracking.first_sightings, vec!["https://acme.test/careers/eng"]);
        assert_eq!(storage.count_changes().unwrap(), 3);
    }

    #[test]
    fn test_unchanged_page_still_refreshes_snapshot() {
        let (mut storage, run_id) = storage_with_run();
        let current = page("https://acme.test/", "<p>Hello</p>");
        let earlier = Utc::now() - chrono::Duration::hours(1);
        let later = Utc::now();

        record_page(&mut storage, run_id, "Acme", &current, FirstSighting::Baseline, earlier)
            .unwrap();
        let outcome =
            record_page(&mut storage, run_id, "Acme", &current, FirstSighting::Baseline, later)
                .unwrap();

        assert_eq!(outcome, PageOutcome::Unchanged);
        let stored = storage.get_snapshot("https://acme.test/").unwrap().unwrap();
        assert_eq!(stored.taken_at.timestamp(), later.timestamp());
        assert_eq!(storage.count_changes().unwrap(), 0);
    }

    #[test]
    fn test_changed_page_records_change_and_new_snapshot() {
        let (mut storage, run_id) = storage_with_run();
        let before = page("https://acme.test/pricing", "<p>$10</p>");
        let after = page("https://acme.test/pricing", "<p>$12</p>");

        record_page(&mut storage, run_id, "Acme", &before, FirstSighting::Baseline, Utc::now())
            .unwrap();
        let outcome =
            record_page(&mut storage, run_id, "Acme", &after, FirstSighting::Baseline, Utc::now())
                .unwrap();

        let PageOutcome::Changed(change) = outcome else {
            panic!("expected a change, got {:?}", outcome);
        };
        assert_eq!(change.previous_hash, before.content_hash);
        assert_eq!(change.new_hash, after.content_hash);
        assert!(change.diff.contains("-$10"));
        assert!(change.diff.contains("+$12"));

        let stored = storage.get_changes_for_run(run_id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].target, "Acme");

        let snapshot = storage
            .get_snapshot("https://acme.test/pricing")
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.raw_text, "$12");
    }

    #[test]
    fn test_target_report_absorbs_jobs() {
        let mut report = TargetReport::new("Acme");
        report.absorb(JobResult {
            target: "Acme".to_string(),
            pages_crawled: 3,
            baselined: 2,
            unchanged: 1,
            ..Default::default()
        });
        report.absorb(JobResult {
            target: "Acme".to_string(),
            pages_crawled: 1,
            unchanged: 1,
            ..Default::default()
        });

        assert_eq!(report.pages_crawled, 4);
        assert_eq!(report.baselined, 2);
        assert_eq!(report.unchanged, 2);
    }
}
