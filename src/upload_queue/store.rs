//! Upload queue storage and persistence.
//!
//! Provides SQLite-backed storage for upload records. The status and request
//! timestamp are mirrored into dedicated columns for cheap scans; the full
//! record lives in a versioned blob column.

use super::codec;
use super::models::{QueueStats, RemoteResult, UploadRecord, UploadStatus};
use super::schema::UPLOAD_QUEUE_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Trait for upload queue storage operations.
///
/// All mutations are atomic per record: callers never observe a status
/// column that disagrees with the record blob.
pub trait UploadStore: Send + Sync {
    /// Insert a record, replacing any existing record for the same path.
    fn put(&self, record: &UploadRecord) -> Result<()>;

    /// Get a record by local path.
    fn get(&self, local_path: &str) -> Result<Option<UploadRecord>>;

    /// Write a new status (and optionally the result that produced it) to an
    /// existing record, but only if the record is still in
    /// `expected_current`. Returns the number of rows updated: 0 means the
    /// record is gone or moved on since the caller observed it, and the
    /// caller must treat its event as stale.
    ///
    /// `last_result` is cleared unless this write carries its own result.
    fn update_status(
        &self,
        local_path: &str,
        expected_current: UploadStatus,
        new_status: UploadStatus,
        result: Option<RemoteResult>,
    ) -> Result<usize>;

    /// Atomically claim a record for transfer (Queued or FailedRetry →
    /// InProgress). Returns true if claimed, false if the record is gone or
    /// not in a claimable state.
    fn claim(&self, local_path: &str) -> Result<bool>;

    /// Delete a record. Returns the number of rows deleted (0 or 1).
    fn remove(&self, local_path: &str) -> Result<usize>;

    /// All records in any of the given statuses, oldest request first.
    /// Undecodable rows are logged and skipped, never fatal.
    fn query_by_status(&self, statuses: &[UploadStatus]) -> Result<Vec<UploadRecord>>;

    /// Delete all records in any of the given statuses. Returns the number
    /// of rows deleted.
    fn purge(&self, statuses: &[UploadStatus]) -> Result<usize>;

    /// Crash recovery: move every InProgress record back to Queued. Returns
    /// the number of records recovered.
    fn reset_in_progress_to_queued(&self) -> Result<usize>;

    /// Per-status record counts.
    fn count_by_status(&self) -> Result<QueueStats>;
}

/// SQLite-backed upload queue store.
pub struct SqliteUploadStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUploadStore {
    /// Create a new SqliteUploadStore.
    ///
    /// Opens an existing database or creates a new one with the current
    /// schema, then runs crash recovery so no record is left InProgress
    /// from a previous process.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                &db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(&db_path)?;
            UPLOAD_QUEUE_VERSIONED_SCHEMAS
                .last()
                .context("No schemas defined")?
                .create(&conn)?;
            info!("Created new upload queue database at {:?}", db_path.as_ref());
            conn
        };

        // Read the database version
        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Upload queue database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        let version = db_version as usize;

        let schema_count = UPLOAD_QUEUE_VERSIONED_SCHEMAS.len();
        if version >= schema_count {
            bail!(
                "Upload queue database version {} is too new (max supported: {})",
                version,
                schema_count - 1
            );
        }

        // Validate schema matches expected structure
        UPLOAD_QUEUE_VERSIONED_SCHEMAS
            .get(version)
            .context("Failed to get schema")?
            .validate(&conn)?;

        Self::migrate_if_needed(&conn, version)?;

        let store = SqliteUploadStore {
            conn: Arc::new(Mutex::new(conn)),
        };

        // Any record still InProgress belonged to a process that died
        // mid-transfer. Recover before serving the first claim.
        let recovered = store.reset_in_progress_to_queued()?;
        if recovered > 0 {
            info!("Recovered {} interrupted uploads back to queued", recovered);
        }

        Ok(store)
    }

    /// Create an in-memory store for testing.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        UPLOAD_QUEUE_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .create(&conn)?;

        Ok(SqliteUploadStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run any pending migrations.
    fn migrate_if_needed(conn: &Connection, current_version: usize) -> Result<()> {
        let target_version = UPLOAD_QUEUE_VERSIONED_SCHEMAS.len() - 1;

        if current_version >= target_version {
            return Ok(());
        }

        info!(
            "Migrating upload queue database from version {} to {}",
            current_version, target_version
        );

        for schema in UPLOAD_QUEUE_VERSIONED_SCHEMAS
            .iter()
            .skip(current_version + 1)
        {
            if let Some(migration_fn) = schema.migration {
                info!("Running upload queue migration to version {}", schema.version);
                migration_fn(conn)?;
            }
        }

        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + target_version),
            [],
        )?;

        Ok(())
    }

    /// Get current timestamp in seconds.
    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Build an `IN (...)` fragment plus its ordinal parameters.
    fn status_in_clause(statuses: &[UploadStatus]) -> (String, Vec<i32>) {
        let placeholders = (1..=statuses.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let ordinals = statuses.iter().map(|s| s.as_i32()).collect();
        (placeholders, ordinals)
    }

    /// Rewrite a record row in place, keeping the mirrored status column in
    /// sync with the blob. Caller must hold the connection lock.
    fn write_record(conn: &Connection, record: &UploadRecord) -> Result<usize> {
        let rows = conn.execute(
            "UPDATE upload_queue SET status = ?1, record_blob = ?2 WHERE local_path = ?3",
            rusqlite::params![
                record.status.as_i32(),
                codec::encode(record)?,
                record.local_path
            ],
        )?;
        Ok(rows)
    }

    /// Read and decode a record. Caller must hold the connection lock.
    fn read_record(conn: &Connection, local_path: &str) -> Result<Option<UploadRecord>> {
        let blob: Option<String> = conn
            .query_row(
                "SELECT record_blob FROM upload_queue WHERE local_path = ?1",
                [local_path],
                |row| row.get(0),
            )
            .optional()?;

        match blob {
            None => Ok(None),
            Some(blob) => {
                let record = codec::decode(&blob)
                    .with_context(|| format!("Corrupt upload record for {}", local_path))?;
                Ok(Some(record))
            }
        }
    }
}

impl UploadStore for SqliteUploadStore {
    fn put(&self, record: &UploadRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"INSERT OR REPLACE INTO upload_queue
               (local_path, status, requested_at, record_blob)
               VALUES (?1, ?2, ?3, ?4)"#,
            rusqlite::params![
                record.local_path,
                record.status.as_i32(),
                record.requested_at,
                codec::encode(record)?,
            ],
        )?;
        Ok(())
    }

    fn get(&self, local_path: &str) -> Result<Option<UploadRecord>> {
        let conn = self.conn.lock().unwrap();
        Self::read_record(&conn, local_path)
    }

    fn update_status(
        &self,
        local_path: &str,
        expected_current: UploadStatus,
        new_status: UploadStatus,
        result: Option<RemoteResult>,
    ) -> Result<usize> {
        let conn = self.conn.lock().unwrap();

        let mut record = match Self::read_record(&conn, local_path)? {
            Some(record) => record,
            None => return Ok(0),
        };
        if record.status != expected_current {
            return Ok(0);
        }

        record.status = new_status;
        record.last_result = result;
        if new_status.is_terminal() {
            record.finished_at = Some(Self::now());
        }

        // The status guard makes this a compare-and-set: if another caller
        // moved the record after `expected_current` was observed, zero rows
        // change and the stale write is lost instead of the newer one.
        let rows = conn.execute(
            "UPDATE upload_queue SET status = ?1, record_blob = ?2
             WHERE local_path = ?3 AND status = ?4",
            rusqlite::params![
                new_status.as_i32(),
                codec::encode(&record)?,
                local_path,
                expected_current.as_i32(),
            ],
        )?;
        Ok(rows)
    }

    fn claim(&self, local_path: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();

        let mut record = match Self::read_record(&conn, local_path)? {
            Some(record) => record,
            None => return Ok(false),
        };

        if !matches!(
            record.status,
            UploadStatus::Queued | UploadStatus::FailedRetry
        ) {
            return Ok(false);
        }

        record.status = UploadStatus::InProgress;
        record.attempt_count += 1;
        record.started_at = Some(Self::now());
        // The previous attempt's result belongs to the old status; a fresh
        // attempt starts with a clean slate.
        record.last_result = None;

        // The status guard in the WHERE clause makes the claim a
        // compare-and-set even if another connection raced us.
        let rows = conn.execute(
            "UPDATE upload_queue SET status = ?1, record_blob = ?2
             WHERE local_path = ?3 AND status IN (?4, ?5)",
            rusqlite::params![
                record.status.as_i32(),
                codec::encode(&record)?,
                local_path,
                UploadStatus::Queued.as_i32(),
                UploadStatus::FailedRetry.as_i32(),
            ],
        )?;

        Ok(rows == 1)
    }

    fn remove(&self, local_path: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM upload_queue WHERE local_path = ?1",
            [local_path],
        )?;
        Ok(rows)
    }

    fn query_by_status(&self, statuses: &[UploadStatus]) -> Result<Vec<UploadRecord>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().unwrap();
        let (placeholders, ordinals) = Self::status_in_clause(statuses);
        let mut stmt = conn.prepare(&format!(
            "SELECT local_path, record_blob FROM upload_queue
             WHERE status IN ({})
             ORDER BY requested_at ASC",
            placeholders
        ))?;

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            ordinals.iter().map(|o| o as &dyn rusqlite::ToSql).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (local_path, blob) in rows {
            match codec::decode(&blob) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping undecodable upload record for {}: {}", local_path, e);
                }
            }
        }
        Ok(records)
    }

    fn purge(&self, statuses: &[UploadStatus]) -> Result<usize> {
        if statuses.is_empty() {
            return Ok(0);
        }

        let conn = self.conn.lock().unwrap();
        let (placeholders, ordinals) = Self::status_in_clause(statuses);
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            ordinals.iter().map(|o| o as &dyn rusqlite::ToSql).collect();
        let rows = conn.execute(
            &format!(
                "DELETE FROM upload_queue WHERE status IN ({})",
                placeholders
            ),
            params_refs.as_slice(),
        )?;
        Ok(rows)
    }

    fn reset_in_progress_to_queued(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT local_path, record_blob FROM upload_queue WHERE status = ?1",
        )?;
        let rows = stmt
            .query_map([UploadStatus::InProgress.as_i32()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        let mut recovered = 0;
        for (local_path, blob) in rows {
            let mut record = match codec::decode(&blob) {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        "Cannot recover undecodable upload record for {}: {}",
                        local_path, e
                    );
                    continue;
                }
            };
            record.status = UploadStatus::Queued;
            record.last_result = None;
            record.started_at = None;
            recovered += Self::write_record(&conn, &record)?;
        }
        Ok(recovered)
    }

    fn count_by_status(&self) -> Result<QueueStats> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM upload_queue GROUP BY status")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, i32>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stats = QueueStats::default();
        for (ordinal, count) in counts {
            let count = count as usize;
            match UploadStatus::from_i32(ordinal) {
                Some(UploadStatus::Queued) => stats.queued = count,
                Some(UploadStatus::InProgress) => stats.in_progress = count,
                Some(UploadStatus::Paused) => stats.paused = count,
                Some(UploadStatus::Succeeded) => stats.succeeded = count,
                Some(UploadStatus::FailedRetry) => stats.failed_retry = count,
                Some(UploadStatus::FailedGiveUp) => stats.failed_give_up = count,
                Some(UploadStatus::Cancelled) => stats.cancelled = count,
                None => warn!("Unknown upload status ordinal {} in database", ordinal),
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload_queue::models::{ResultCode, UploadRequest};
    use tempfile::tempdir;

    fn record(path: &str) -> UploadRecord {
        UploadRecord::from_request(UploadRequest::new(
            path,
            format!("/remote{}", path),
            "image/jpeg",
            "alice@example.com",
        ))
    }

    fn record_at(path: &str, requested_at: i64) -> UploadRecord {
        let mut r = record(path);
        r.requested_at = requested_at;
        r
    }

    #[test]
    fn test_create_new_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("upload_queue.db");

        let store = SqliteUploadStore::new(&db_path).unwrap();
        assert!(db_path.exists());

        let conn = store.conn.lock().unwrap();
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='upload_queue'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_schema_version_stored() {
        let store = SqliteUploadStore::in_memory().unwrap();

        let conn = store.conn.lock().unwrap();
        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();

        assert_eq!(version as usize, BASE_DB_VERSION);
    }

    #[test]
    fn test_put_and_get() {
        let store = SqliteUploadStore::in_memory().unwrap();
        let r = record("/a.jpg");

        store.put(&r).unwrap();

        let fetched = store.get("/a.jpg").unwrap().unwrap();
        assert_eq!(fetched, r);
        assert!(store.get("/missing.jpg").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces_existing_path() {
        let store = SqliteUploadStore::in_memory().unwrap();

        let mut old = record_at("/a.jpg", 1000);
        old.status = UploadStatus::FailedGiveUp;
        store.put(&old).unwrap();

        let fresh = record_at("/a.jpg", 2000);
        store.put(&fresh).unwrap();

        let fetched = store.get("/a.jpg").unwrap().unwrap();
        assert_eq!(fetched.status, UploadStatus::Queued);
        assert_eq!(fetched.requested_at, 2000);

        let all = store
            .query_by_status(&[UploadStatus::Queued, UploadStatus::FailedGiveUp])
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_update_status_clears_result_by_default() {
        let store = SqliteUploadStore::in_memory().unwrap();
        let mut r = record("/a.jpg");
        r.last_result = Some(RemoteResult::new(ResultCode::Timeout));
        r.status = UploadStatus::Paused;
        store.put(&r).unwrap();

        let rows = store
            .update_status("/a.jpg", UploadStatus::Paused, UploadStatus::Queued, None)
            .unwrap();
        assert_eq!(rows, 1);

        let fetched = store.get("/a.jpg").unwrap().unwrap();
        assert_eq!(fetched.status, UploadStatus::Queued);
        assert!(fetched.last_result.is_none());
    }

    #[test]
    fn test_update_status_with_result_stamps_finished_at() {
        let store = SqliteUploadStore::in_memory().unwrap();
        let mut r = record("/a.jpg");
        r.status = UploadStatus::InProgress;
        store.put(&r).unwrap();

        store
            .update_status(
                "/a.jpg",
                UploadStatus::InProgress,
                UploadStatus::FailedGiveUp,
                Some(RemoteResult::new(ResultCode::QuotaExceeded)),
            )
            .unwrap();

        let fetched = store.get("/a.jpg").unwrap().unwrap();
        assert_eq!(fetched.status, UploadStatus::FailedGiveUp);
        assert_eq!(
            fetched.last_result,
            Some(RemoteResult::new(ResultCode::QuotaExceeded))
        );
        assert!(fetched.finished_at.is_some());
    }

    #[test]
    fn test_update_status_missing_row() {
        let store = SqliteUploadStore::in_memory().unwrap();
        let rows = store
            .update_status(
                "/missing.jpg",
                UploadStatus::Queued,
                UploadStatus::Cancelled,
                None,
            )
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_update_status_stale_expectation_changes_nothing() {
        let store = SqliteUploadStore::in_memory().unwrap();
        let mut r = record("/a.jpg");
        r.status = UploadStatus::Cancelled;
        store.put(&r).unwrap();

        // A caller that still believes the record is InProgress must not be
        // able to move it anywhere.
        let rows = store
            .update_status(
                "/a.jpg",
                UploadStatus::InProgress,
                UploadStatus::Succeeded,
                Some(RemoteResult::new(ResultCode::Ok)),
            )
            .unwrap();
        assert_eq!(rows, 0);

        let fetched = store.get("/a.jpg").unwrap().unwrap();
        assert_eq!(fetched.status, UploadStatus::Cancelled);
        assert!(fetched.last_result.is_none());
    }

    #[test]
    fn test_claim_from_queued() {
        let store = SqliteUploadStore::in_memory().unwrap();
        store.put(&record("/a.jpg")).unwrap();

        assert!(store.claim("/a.jpg").unwrap());

        let fetched = store.get("/a.jpg").unwrap().unwrap();
        assert_eq!(fetched.status, UploadStatus::InProgress);
        assert_eq!(fetched.attempt_count, 1);
        assert!(fetched.started_at.is_some());
    }

    #[test]
    fn test_claim_from_failed_retry_increments_attempts() {
        let store = SqliteUploadStore::in_memory().unwrap();
        let mut r = record("/a.jpg");
        r.status = UploadStatus::FailedRetry;
        r.attempt_count = 2;
        r.last_result = Some(RemoteResult::new(ResultCode::Timeout));
        store.put(&r).unwrap();

        assert!(store.claim("/a.jpg").unwrap());

        let fetched = store.get("/a.jpg").unwrap().unwrap();
        assert_eq!(fetched.attempt_count, 3);
        // The failure that put the record in FailedRetry belongs to the
        // previous attempt, not the one just claimed.
        assert!(fetched.last_result.is_none());
    }

    #[test]
    fn test_claim_rejects_other_states() {
        let store = SqliteUploadStore::in_memory().unwrap();

        for status in [
            UploadStatus::InProgress,
            UploadStatus::Paused,
            UploadStatus::Succeeded,
            UploadStatus::FailedGiveUp,
            UploadStatus::Cancelled,
        ] {
            let mut r = record("/a.jpg");
            r.status = status;
            store.put(&r).unwrap();
            assert!(!store.claim("/a.jpg").unwrap(), "claimed from {:?}", status);
        }

        assert!(!store.claim("/missing.jpg").unwrap());
    }

    #[test]
    fn test_double_claim_fails() {
        let store = SqliteUploadStore::in_memory().unwrap();
        store.put(&record("/a.jpg")).unwrap();

        assert!(store.claim("/a.jpg").unwrap());
        assert!(!store.claim("/a.jpg").unwrap());
    }

    #[test]
    fn test_query_by_status_ordering_and_filter() {
        let store = SqliteUploadStore::in_memory().unwrap();

        store.put(&record_at("/b.jpg", 2000)).unwrap();
        store.put(&record_at("/a.jpg", 1000)).unwrap();
        let mut failed = record_at("/c.jpg", 1500);
        failed.status = UploadStatus::FailedRetry;
        store.put(&failed).unwrap();
        let mut done = record_at("/d.jpg", 500);
        done.status = UploadStatus::Succeeded;
        store.put(&done).unwrap();

        let pending = store
            .query_by_status(&[UploadStatus::Queued, UploadStatus::FailedRetry])
            .unwrap();
        let paths: Vec<&str> = pending.iter().map(|r| r.local_path.as_str()).collect();
        assert_eq!(paths, vec!["/a.jpg", "/c.jpg", "/b.jpg"]);

        assert!(store.query_by_status(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_query_by_status_skips_corrupt_rows() {
        let store = SqliteUploadStore::in_memory().unwrap();
        store.put(&record_at("/good.jpg", 1000)).unwrap();

        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO upload_queue (local_path, status, requested_at, record_blob)
                 VALUES ('/bad.jpg', 0, 500, 'garbage')",
                [],
            )
            .unwrap();
        }

        let pending = store.query_by_status(&[UploadStatus::Queued]).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].local_path, "/good.jpg");
    }

    #[test]
    fn test_remove() {
        let store = SqliteUploadStore::in_memory().unwrap();
        store.put(&record("/a.jpg")).unwrap();

        assert_eq!(store.remove("/a.jpg").unwrap(), 1);
        assert_eq!(store.remove("/a.jpg").unwrap(), 0);
        assert!(store.get("/a.jpg").unwrap().is_none());
    }

    #[test]
    fn test_purge() {
        let store = SqliteUploadStore::in_memory().unwrap();

        let mut done = record("/done.jpg");
        done.status = UploadStatus::Succeeded;
        store.put(&done).unwrap();
        let mut gave_up = record("/gave_up.jpg");
        gave_up.status = UploadStatus::FailedGiveUp;
        store.put(&gave_up).unwrap();
        store.put(&record("/pending.jpg")).unwrap();

        let purged = store
            .purge(&[UploadStatus::Succeeded, UploadStatus::FailedGiveUp])
            .unwrap();
        assert_eq!(purged, 2);
        assert!(store.get("/pending.jpg").unwrap().is_some());
        assert_eq!(store.purge(&[]).unwrap(), 0);
    }

    #[test]
    fn test_reset_in_progress_to_queued() {
        let store = SqliteUploadStore::in_memory().unwrap();

        let mut running = record("/running.jpg");
        running.status = UploadStatus::InProgress;
        running.started_at = Some(123);
        running.last_result = Some(RemoteResult::new(ResultCode::Timeout));
        store.put(&running).unwrap();
        store.put(&record("/queued.jpg")).unwrap();

        let recovered = store.reset_in_progress_to_queued().unwrap();
        assert_eq!(recovered, 1);

        let fetched = store.get("/running.jpg").unwrap().unwrap();
        assert_eq!(fetched.status, UploadStatus::Queued);
        assert!(fetched.last_result.is_none());
        assert!(fetched.started_at.is_none());
    }

    #[test]
    fn test_reopen_recovers_in_progress() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("upload_queue.db");

        {
            let store = SqliteUploadStore::new(&db_path).unwrap();
            store.put(&record("/a.jpg")).unwrap();
            assert!(store.claim("/a.jpg").unwrap());
            // Process "dies" here with the record InProgress.
        }

        let store = SqliteUploadStore::new(&db_path).unwrap();
        let fetched = store.get("/a.jpg").unwrap().unwrap();
        assert_eq!(fetched.status, UploadStatus::Queued);
        // The interrupted attempt still counts.
        assert_eq!(fetched.attempt_count, 1);
    }

    #[test]
    fn test_count_by_status() {
        let store = SqliteUploadStore::in_memory().unwrap();

        store.put(&record("/q1.jpg")).unwrap();
        store.put(&record("/q2.jpg")).unwrap();
        let mut done = record("/done.jpg");
        done.status = UploadStatus::Succeeded;
        store.put(&done).unwrap();
        let mut paused = record("/paused.jpg");
        paused.status = UploadStatus::Paused;
        store.put(&paused).unwrap();

        let stats = store.count_by_status().unwrap();
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.paused, 1);
        assert_eq!(stats.in_progress, 0);
        assert_eq!(stats.unfinished(), 3);
    }
}
