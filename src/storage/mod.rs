//! Storage module for persisting snapshots and change history
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Snapshot persistence keyed by normalized URL
//! - Change record history
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{SnapshotStore, Storage, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Last persisted observation of a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Normalized URL
    pub url: String,

    /// Hex SHA-256 of `raw_text`
    pub content_hash: String,

    /// Extracted page text at the time of the observation
    pub raw_text: String,

    /// When the observation was made
    pub taken_at: DateTime<Utc>,
}

/// A change record as persisted for a run
#[derive(Debug, Clone)]
pub struct StoredChange {
    pub id: i64,
    pub run_id: i64,
    pub target: String,
    pub url: String,
    pub previous_hash: String,
    pub new_hash: String,
    pub diff: String,
    pub detected_at: String,
}

/// Represents a watch run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a watch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
