//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::change::ChangeRecord;
use crate::storage::{RunRecord, RunStatus, Snapshot, StoredChange};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt timestamp for {url}: {value}")]
    BadTimestamp { url: String, value: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Snapshot persistence keyed by normalized URL
///
/// This is the only storage surface change detection needs: read the last
/// observation of a URL before comparing, write the new one afterwards.
pub trait SnapshotStore {
    /// Gets the last snapshot of a URL, if one was ever stored
    fn get_snapshot(&self, url: &str) -> StorageResult<Option<Snapshot>>;

    /// Inserts or replaces the snapshot of `snapshot.url`
    ///
    /// # Arguments
    ///
    /// * `target` - Name of the configured target the page belongs to
    /// * `snapshot` - The new observation
    fn put_snapshot(&mut self, target: &str, snapshot: &Snapshot) -> StorageResult<()>;
}

/// Full storage backend used by watch runs
pub trait Storage: SnapshotStore {
    // ===== Run Management =====

    /// Creates a new watch run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Change History =====

    /// Persists a detected change
    ///
    /// # Returns
    ///
    /// The ID of the stored change
    fn record_change(
        &mut self,
        run_id: i64,
        target: &str,
        change: &ChangeRecord,
    ) -> StorageResult<i64>;

    /// Gets all changes recorded by a run, in detection order
    fn get_changes_for_run(&self, run_id: i64) -> StorageResult<Vec<StoredChange>>;

    /// Stores the outcome of comparing one page, atomically
    ///
    /// Upserts `snapshot` and, when `change` is given, records it against
    /// `run_id`. Either both writes land or neither does.
    fn record_observation(
        &mut self,
        run_id: i64,
        target: &str,
        snapshot: &Snapshot,
        change: Option<&ChangeRecord>,
    ) -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts stored snapshots
    fn count_snapshots(&self) -> StorageResult<u64>;

    /// Counts recorded changes
    fn count_changes(&self) -> StorageResult<u64>;

    /// Counts runs
    fn count_runs(&self) -> StorageResult<u64>;

    /// Gets snapshot counts per target, sorted by target name
    fn get_snapshot_counts_by_target(&self) -> StorageResult<Vec<(String, u64)>>;
}
