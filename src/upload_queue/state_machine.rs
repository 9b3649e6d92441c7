//! Pure status transition rules for upload records.
//!
//! Everything here is a total function over enums: no storage, no clocks.
//! Callers apply the returned status (or drop the event when `None`), which
//! keeps the legality rules in one place and trivially testable.

use super::models::{ResultCode, UploadStatus};

/// An external stimulus applied to an existing record.
///
/// Enqueueing is not an event: it creates a fresh record instead of
/// transitioning an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A worker takes the record for transfer.
    Claim,
    /// The worker finished and the remote accepted the file.
    ReportSuccess,
    /// The worker finished and the attempt failed.
    ReportFailure(ResultCode),
    /// The user suspends the upload.
    Pause,
    /// The user resumes a paused upload.
    Resume,
    /// The user abandons the upload.
    Cancel,
}

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Permanent,
}

impl ResultCode {
    /// Failure classification. `Ok` is not a failure and classifies as
    /// `None`. The match is deliberately closed: a new result code fails to
    /// compile until someone decides its retry policy.
    pub fn classify(&self) -> Option<FailureKind> {
        match self {
            ResultCode::Ok => None,
            ResultCode::NetworkUnreachable => Some(FailureKind::Transient),
            ResultCode::Timeout => Some(FailureKind::Transient),
            ResultCode::ServerBusy => Some(FailureKind::Transient),
            ResultCode::RateLimited => Some(FailureKind::Transient),
            ResultCode::ServiceUnavailable => Some(FailureKind::Transient),
            ResultCode::Unknown => Some(FailureKind::Transient),
            ResultCode::AuthRejected => Some(FailureKind::Permanent),
            ResultCode::Forbidden => Some(FailureKind::Permanent),
            ResultCode::QuotaExceeded => Some(FailureKind::Permanent),
            ResultCode::Conflict => Some(FailureKind::Permanent),
            ResultCode::LocalFileMissing => Some(FailureKind::Permanent),
            ResultCode::LocalFileUnreadable => Some(FailureKind::Permanent),
        }
    }
}

/// Compute the status a record moves to when `event` arrives in `current`.
///
/// `None` means the event is illegal or stale in this state and must be
/// silently dropped. Terminal states accept no events at all, which is what
/// makes late worker reports after a cancel harmless.
pub fn transition(current: UploadStatus, event: Event) -> Option<UploadStatus> {
    use UploadStatus::*;

    match (current, event) {
        (Queued, Event::Claim) => Some(InProgress),
        (Queued, Event::Pause) => Some(Paused),
        (Queued, Event::Cancel) => Some(Cancelled),

        (FailedRetry, Event::Claim) => Some(InProgress),
        (FailedRetry, Event::Pause) => Some(Paused),
        (FailedRetry, Event::Cancel) => Some(Cancelled),

        (InProgress, Event::ReportSuccess) => Some(Succeeded),
        // A "failure" report carrying Ok classifies as None and is dropped
        // instead of parking the record in a failed state.
        (InProgress, Event::ReportFailure(code)) => match code.classify() {
            Some(FailureKind::Transient) => Some(FailedRetry),
            Some(FailureKind::Permanent) => Some(FailedGiveUp),
            None => None,
        },
        (InProgress, Event::Cancel) => Some(Cancelled),

        (Paused, Event::Resume) => Some(Queued),
        (Paused, Event::Cancel) => Some(Cancelled),

        _ => None,
    }
}
