//! The upload queue facade.
//!
//! Composes the store, the transition rules and the change notifier into the
//! one surface the rest of the app talks to. The handle is cheap to clone
//! and every operation is a single bounded storage transaction.

use super::models::{
    QueueStats, RemoteResult, ResultCode, TransferConstraints, UploadRecord, UploadRequest,
    UploadStatus,
};
use super::notifier::{ChangeNotifier, QueueChange};
use super::state_machine::{transition, Event};
use super::store::{SqliteUploadStore, UploadStore};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Decides whether a record's transfer constraints are currently satisfied
/// (connectivity, charging state, delay window).
///
/// The queue never evaluates constraints itself; the scheduler supplies the
/// environment through this trait.
pub trait ConditionProvider {
    fn is_satisfied(&self, constraints: &TransferConstraints) -> bool;
}

impl<F> ConditionProvider for F
where
    F: Fn(&TransferConstraints) -> bool,
{
    fn is_satisfied(&self, constraints: &TransferConstraints) -> bool {
        self(constraints)
    }
}

/// Cloneable handle to the persistent upload queue.
#[derive(Clone)]
pub struct UploadQueue {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn UploadStore>,
    notifier: ChangeNotifier,
}

impl UploadQueue {
    /// Open (or create) the queue database named by `settings`.
    pub fn open(settings: &crate::config::UploadQueueSettings) -> Result<Self> {
        let store = SqliteUploadStore::new(settings.upload_queue_db_path())?;
        Ok(Self::new(Arc::new(store), settings.notify_capacity))
    }

    pub fn new(store: Arc<dyn UploadStore>, notify_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                notifier: ChangeNotifier::new(notify_capacity),
            }),
        }
    }

    /// Subscribe to queue changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueChange> {
        self.inner.notifier.subscribe()
    }

    /// Durably record a new upload request.
    ///
    /// A request for a path that already has a record supersedes it: the old
    /// record is replaced and a fresh lifecycle begins.
    pub fn enqueue(&self, request: UploadRequest) -> Result<UploadRecord> {
        if request.local_path.is_empty() || !request.local_path.starts_with('/') {
            bail!(
                "Upload local path must be absolute, got {:?}",
                request.local_path
            );
        }
        if request.remote_path.is_empty() {
            bail!("Upload remote path must not be empty");
        }
        if request.account_name.is_empty() {
            bail!("Upload account name must not be empty");
        }

        let record = UploadRecord::from_request(request);
        self.inner
            .store
            .put(&record)
            .with_context(|| format!("Failed to enqueue upload for {}", record.local_path))?;
        self.inner.notifier.notify(1);
        Ok(record)
    }

    /// Claim the oldest pending record whose constraints the provider
    /// accepts, moving it to InProgress. Returns None when nothing is
    /// eligible right now.
    ///
    /// A claim lost to a concurrent worker is not an error; the scan simply
    /// moves on to the next candidate.
    pub fn claim_next(
        &self,
        conditions: &dyn ConditionProvider,
    ) -> Result<Option<UploadRecord>> {
        let pending = self
            .inner
            .store
            .query_by_status(&[UploadStatus::Queued, UploadStatus::FailedRetry])?;

        for candidate in pending {
            if !conditions.is_satisfied(&candidate.constraints) {
                continue;
            }
            if self.inner.store.claim(&candidate.local_path)? {
                let claimed = self
                    .inner
                    .store
                    .get(&candidate.local_path)?
                    .with_context(|| {
                        format!("Claimed upload vanished: {}", candidate.local_path)
                    })?;
                self.inner.notifier.notify(1);
                return Ok(Some(claimed));
            }
            debug!("Lost claim race for {}, trying next", candidate.local_path);
        }
        Ok(None)
    }

    /// Record the outcome of a finished transfer attempt.
    ///
    /// Stale reports (record gone, cancelled or otherwise no longer
    /// InProgress) are dropped silently.
    pub fn report_result(&self, local_path: &str, result: RemoteResult) -> Result<()> {
        let event = match result.code {
            ResultCode::Ok => Event::ReportSuccess,
            code => Event::ReportFailure(code),
        };
        self.apply_event(local_path, event, Some(result))
    }

    /// Abandon an upload. A no-op on terminal or missing records.
    pub fn cancel(&self, local_path: &str) -> Result<()> {
        self.apply_event(local_path, Event::Cancel, None)
    }

    /// Suspend a pending upload. A no-op unless the record is Queued or
    /// FailedRetry.
    pub fn pause(&self, local_path: &str) -> Result<()> {
        self.apply_event(local_path, Event::Pause, None)
    }

    /// Put a paused upload back in line. A no-op unless the record is Paused.
    pub fn resume(&self, local_path: &str) -> Result<()> {
        self.apply_event(local_path, Event::Resume, None)
    }

    /// Delete one record outright, whatever its state.
    pub fn remove(&self, local_path: &str) -> Result<usize> {
        let rows = self.inner.store.remove(local_path)?;
        self.inner.notifier.notify(rows);
        Ok(rows)
    }

    /// Delete all succeeded records. Returns how many were removed.
    pub fn purge_finished(&self) -> Result<usize> {
        let rows = self.inner.store.purge(&[UploadStatus::Succeeded])?;
        self.inner.notifier.notify(rows);
        Ok(rows)
    }

    /// Delete all given-up and cancelled records. Returns how many were
    /// removed.
    pub fn purge_failed(&self) -> Result<usize> {
        let rows = self
            .inner
            .store
            .purge(&[UploadStatus::FailedGiveUp, UploadStatus::Cancelled])?;
        self.inner.notifier.notify(rows);
        Ok(rows)
    }

    /// Records waiting for a worker (Queued or FailedRetry), oldest first.
    pub fn pending(&self) -> Result<Vec<UploadRecord>> {
        self.inner
            .store
            .query_by_status(&[UploadStatus::Queued, UploadStatus::FailedRetry])
    }

    /// Records currently being transferred.
    pub fn in_progress(&self) -> Result<Vec<UploadRecord>> {
        self.inner.store.query_by_status(&[UploadStatus::InProgress])
    }

    /// Records that will never be retried (gave up or cancelled).
    pub fn failed_terminal(&self) -> Result<Vec<UploadRecord>> {
        self.inner
            .store
            .query_by_status(&[UploadStatus::FailedGiveUp, UploadStatus::Cancelled])
    }

    /// Records whose transfer completed successfully.
    pub fn finished(&self) -> Result<Vec<UploadRecord>> {
        self.inner.store.query_by_status(&[UploadStatus::Succeeded])
    }

    /// Look up a single record.
    pub fn get(&self, local_path: &str) -> Result<Option<UploadRecord>> {
        self.inner.store.get(local_path)
    }

    /// Per-status record counts.
    pub fn stats(&self) -> Result<QueueStats> {
        self.inner.store.count_by_status()
    }

    fn apply_event(
        &self,
        local_path: &str,
        event: Event,
        result: Option<RemoteResult>,
    ) -> Result<()> {
        let record = match self.inner.store.get(local_path)? {
            Some(record) => record,
            None => {
                debug!("Dropping {:?} for unknown upload {}", event, local_path);
                return Ok(());
            }
        };

        let new_status = match transition(record.status, event) {
            Some(status) => status,
            None => {
                debug!(
                    "Dropping stale {:?} for {} in {:?}",
                    event, local_path, record.status
                );
                return Ok(());
            }
        };

        // Compare-and-set against the status we based the transition on.
        // Zero rows means another caller moved the record between our read
        // and this write, so the event is stale and gets dropped.
        let rows = self
            .inner
            .store
            .update_status(local_path, record.status, new_status, result)?;
        if rows == 0 {
            debug!(
                "Dropping {:?} for {}: record moved on from {:?}",
                event, local_path, record.status
            );
        }
        self.inner.notifier.notify(rows);
        Ok(())
    }
}
