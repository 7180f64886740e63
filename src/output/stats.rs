//! Statistics from the snapshot database
//!
//! This module provides functionality for extracting and displaying
//! watch statistics from the storage layer.

use crate::storage::{RunRecord, Storage, StorageResult};

/// Snapshot database statistics summary
#[derive(Debug, Clone)]
pub struct WatchStatistics {
    /// Number of URLs with a stored snapshot
    pub total_snapshots: u64,

    /// Number of change records across all runs
    pub total_changes: u64,

    /// Number of watch runs
    pub total_runs: u64,

    /// Snapshot count per target, largest first
    pub snapshots_by_target: Vec<(String, u64)>,

    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Changes recorded by the most recent run
    pub latest_run_changes: u64,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<WatchStatistics> {
    let latest_run = storage.get_latest_run()?;
    let latest_run_changes = match &latest_run {
        Some(run) => storage.get_changes_for_run(run.id)?.len() as u64,
        None => 0,
    };

    let mut snapshots_by_target = storage.get_snapshot_counts_by_target()?;
    snapshots_by_target.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(WatchStatistics {
        total_snapshots: storage.count_snapshots()?,
        total_changes: storage.count_changes()?,
        total_runs: storage.count_runs()?,
        snapshots_by_target,
        latest_run,
        latest_run_changes,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &WatchStatistics) {
    println!("=== Driftwatch Statistics ===\n");

    println!("Overview:");
    println!("  Snapshots stored: {}", stats.total_snapshots);
    println!("  Changes recorded: {}", stats.total_changes);
    println!("  Watch runs: {}", stats.total_runs);
    println!();

    if !stats.snapshots_by_target.is_empty() {
        println!("Snapshots by Target:");
        for (target, count) in &stats.snapshots_by_target {
            let percentage = if stats.total_snapshots > 0 {
                (*count as f64 / stats.total_snapshots as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", target, count, percentage);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Status: {}", run.status.to_db_string());
            println!("  Changes: {}", stats.latest_run_changes);
        }
        None => println!("No watch runs recorded yet."),
    }
}
