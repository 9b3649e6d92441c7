//! Data models for the upload queue.
//!
//! Defines upload records, statuses, transfer constraints, and remote results.

use serde::{Deserialize, Serialize};

/// Status of an upload record in the queue.
///
/// Stored in the database as an integer ordinal, so the discriminant values
/// are part of the on-disk format and must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadStatus {
    Queued = 0,
    InProgress = 1,
    Paused = 2,
    Succeeded = 3,  // terminal
    FailedRetry = 4,
    FailedGiveUp = 5, // terminal
    Cancelled = 6,    // terminal
}

impl UploadStatus {
    /// Returns true if this is a terminal state (Succeeded, FailedGiveUp or Cancelled).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Succeeded | UploadStatus::FailedGiveUp | UploadStatus::Cancelled
        )
    }

    /// Returns true if the record still needs work (everything non-terminal).
    pub fn is_unfinished(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(UploadStatus::Queued),
            1 => Some(UploadStatus::InProgress),
            2 => Some(UploadStatus::Paused),
            3 => Some(UploadStatus::Succeeded),
            4 => Some(UploadStatus::FailedRetry),
            5 => Some(UploadStatus::FailedGiveUp),
            6 => Some(UploadStatus::Cancelled),
            _ => None,
        }
    }
}

/// What happens to the local file once its upload finishes.
///
/// The queue only stores this; the transfer worker interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocalAction {
    Copy,
    Move,
    Forget,
    Delete,
}

impl LocalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalAction::Copy => "COPY",
            LocalAction::Move => "MOVE",
            LocalAction::Forget => "FORGET",
            LocalAction::Delete => "DELETE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "COPY" => Some(LocalAction::Copy),
            "MOVE" => Some(LocalAction::Move),
            "FORGET" => Some(LocalAction::Forget),
            "DELETE" => Some(LocalAction::Delete),
            _ => None,
        }
    }
}

/// Environmental conditions required before a record may be claimed.
///
/// Evaluated by the scheduler's condition provider, never by the store itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransferConstraints {
    /// Only transfer on an unmetered connection.
    #[serde(default)]
    pub wifi_only: bool,
    /// Only transfer while the device is charging.
    #[serde(default)]
    pub charging_only: bool,
    /// Do not transfer before this Unix timestamp (delayed uploads).
    #[serde(default)]
    pub not_before: Option<i64>,
}

/// Outcome code reported by the transfer worker for a finished attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Ok,
    // Transient: the same upload may succeed later.
    NetworkUnreachable,
    Timeout,
    ServerBusy,
    RateLimited,
    ServiceUnavailable,
    Unknown,
    // Permanent: retrying without user intervention cannot help.
    AuthRejected,
    Forbidden,
    QuotaExceeded,
    Conflict,
    LocalFileMissing,
    LocalFileUnreadable,
}

/// Result of the last finished attempt: the code plus an optional
/// human-readable detail (server message, IO error text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResult {
    pub code: ResultCode,
    #[serde(default)]
    pub detail: Option<String>,
}

impl RemoteResult {
    pub fn new(code: ResultCode) -> Self {
        Self { code, detail: None }
    }

    pub fn with_detail(code: ResultCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: Some(detail.into()),
        }
    }
}

/// Everything the caller supplies when enqueueing an upload.
///
/// The queue turns this into a fresh [`UploadRecord`] in `Queued` state.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub local_path: String,
    pub remote_path: String,
    pub mime_type: String,
    pub account_name: String,
    pub local_action: LocalAction,
    pub force_overwrite: bool,
    pub create_remote_folder: bool,
    pub constraints: TransferConstraints,
}

impl UploadRequest {
    pub fn new(
        local_path: impl Into<String>,
        remote_path: impl Into<String>,
        mime_type: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            mime_type: mime_type.into(),
            account_name: account_name.into(),
            local_action: LocalAction::Forget,
            force_overwrite: false,
            create_remote_folder: false,
            constraints: TransferConstraints::default(),
        }
    }

    pub fn with_local_action(mut self, action: LocalAction) -> Self {
        self.local_action = action;
        self
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn with_create_remote_folder(mut self, create: bool) -> Self {
        self.create_remote_folder = create;
        self
    }

    pub fn with_constraints(mut self, constraints: TransferConstraints) -> Self {
        self.constraints = constraints;
        self
    }
}

/// A single durable upload record.
///
/// `local_path` is the natural key: at most one unfinished record exists per
/// local file, and re-enqueueing the same path supersedes the old record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Absolute path of the local file to transfer. Natural key.
    pub local_path: String,
    /// Target path on the remote storage.
    pub remote_path: String,
    /// MIME type of the payload.
    pub mime_type: String,
    /// Account the upload belongs to.
    pub account_name: String,
    /// What to do with the local file after a successful transfer.
    pub local_action: LocalAction,
    /// Overwrite the remote file if it already exists.
    pub force_overwrite: bool,
    /// Create missing remote parent folders before transferring.
    pub create_remote_folder: bool,
    /// Conditions required before the record may be claimed.
    #[serde(default)]
    pub constraints: TransferConstraints,
    /// When the upload was requested (Unix timestamp). Immutable.
    pub requested_at: i64,
    /// Current status in the state machine.
    pub status: UploadStatus,
    /// Result of the last finished attempt; cleared when re-entering Queued.
    #[serde(default)]
    pub last_result: Option<RemoteResult>,
    /// Number of claims so far.
    #[serde(default)]
    pub attempt_count: i32,
    /// When the last attempt started (InProgress began).
    #[serde(default)]
    pub started_at: Option<i64>,
    /// When the record reached a terminal state.
    #[serde(default)]
    pub finished_at: Option<i64>,
}

impl UploadRecord {
    /// Build a fresh Queued record from an enqueue request.
    pub fn from_request(request: UploadRequest) -> Self {
        Self {
            local_path: request.local_path,
            remote_path: request.remote_path,
            mime_type: request.mime_type,
            account_name: request.account_name,
            local_action: request.local_action,
            force_overwrite: request.force_overwrite,
            create_remote_folder: request.create_remote_folder,
            constraints: request.constraints,
            requested_at: chrono::Utc::now().timestamp(),
            status: UploadStatus::Queued,
            last_result: None,
            attempt_count: 0,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Per-status record counts, for UI badges and monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub queued: usize,
    pub in_progress: usize,
    pub paused: usize,
    pub succeeded: usize,
    pub failed_retry: usize,
    pub failed_give_up: usize,
    pub cancelled: usize,
}

impl QueueStats {
    /// Records still needing work.
    pub fn unfinished(&self) -> usize {
        self.queued + self.in_progress + self.paused + self.failed_retry
    }
}
