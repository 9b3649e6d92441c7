//! Upload Queue Library
//!
//! Persistent upload queue for a cloud file-sync client. Records what must
//! be transferred where, survives process death, and drives each upload
//! through a retry/give-up state machine.

pub mod config;
pub mod sqlite_persistence;
pub mod upload_queue;

// Re-export commonly used types for convenience
pub use config::{UploadQueueConfig, UploadQueueSettings};
pub use upload_queue::{
    ConditionProvider, QueueChange, RemoteResult, ResultCode, SqliteUploadStore,
    TransferConstraints, UploadQueue, UploadRecord, UploadRequest, UploadStatus, UploadStore,
};
