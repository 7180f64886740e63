//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the storage traits.

use crate::change::ChangeRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SnapshotStore, Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, Snapshot, StoredChange};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
    })
}

fn upsert_snapshot(conn: &Connection, target: &str, snapshot: &Snapshot) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO snapshots (url, target, content_hash, raw_text, taken_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(url) DO UPDATE SET
            target = excluded.target,
            content_hash = excluded.content_hash,
            raw_text = excluded.raw_text,
            taken_at = excluded.taken_at",
        params![
            snapshot.url,
            target,
            snapshot.content_hash,
            snapshot.raw_text,
            snapshot.taken_at.to_rfc3339()
        ],
    )?;
    Ok(())
}

fn insert_change(
    conn: &Connection,
    run_id: i64,
    target: &str,
    change: &ChangeRecord,
) -> StorageResult<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO changes (run_id, target, url, previous_hash, new_hash, diff, detected_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            run_id,
            target,
            change.url,
            change.previous_hash,
            change.new_hash,
            change.diff,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl SnapshotStore for SqliteStorage {
    fn get_snapshot(&self, url: &str) -> StorageResult<Option<Snapshot>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT content_hash, raw_text, taken_at FROM snapshots WHERE url = ?1",
                params![url],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((content_hash, raw_text, taken_at)) = row else {
            return Ok(None);
        };

        let taken_at = DateTime::parse_from_rfc3339(&taken_at)
            .map_err(|_| StorageError::BadTimestamp {
                url: url.to_string(),
                value: taken_at.clone(),
            })?
            .with_timezone(&Utc);

        Ok(Some(Snapshot {
            url: url.to_string(),
            content_hash,
            raw_text,
            taken_at,
        }))
    }

    fn put_snapshot(&mut self, target: &str, snapshot: &Snapshot) -> StorageResult<()> {
        upsert_snapshot(&self.conn, target, snapshot)
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Change History =====

    fn record_change(
        &mut self,
        run_id: i64,
        target: &str,
        change: &ChangeRecord,
    ) -> StorageResult<i64> {
        insert_change(&self.conn, run_id, target, change)
    }

    fn record_observation(
        &mut self,
        run_id: i64,
        target: &str,
        snapshot: &Snapshot,
        change: Option<&ChangeRecord>,
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        upsert_snapshot(&tx, target, snapshot)?;
        if let Some(change) = change {
            insert_change(&tx, run_id, target, change)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_changes_for_run(&self, run_id: i64) -> StorageResult<Vec<StoredChange>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, target, url, previous_hash, new_hash, diff, detected_at
             FROM changes WHERE run_id = ?1 ORDER BY id ASC",
        )?;

        let changes = stmt
            .query_map(params![run_id], |row| {
                Ok(StoredChange {
                    id: row.get(0)?,
                    run_id: row.get(1)?,
                    target: row.get(2)?,
                    url: row.get(3)?,
                    previous_hash: row.get(4)?,
                    new_hash: row.get(5)?,
                    diff: row.get(6)?,
                    detected_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(changes)
    }

    // ===== Statistics =====

    fn count_snapshots(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_changes(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM changes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn get_snapshot_counts_by_target(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT target, COUNT(*) FROM snapshots GROUP BY target ORDER BY target ASC",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }
}
