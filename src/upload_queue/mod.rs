//! Upload queue module
//!
//! A persistent, crash-safe queue of file uploads: durable records in
//! SQLite, an atomic claim for transfer workers, retry/give-up transition
//! rules and broadcast change notification for observers.

mod codec;
mod models;
mod notifier;
mod queue;
mod schema;
mod state_machine;
mod store;

pub use codec::{decode, encode, CodecError, CODEC_VERSION};
pub use models::*;
pub use notifier::{ChangeNotifier, QueueChange};
pub use queue::{ConditionProvider, UploadQueue};
pub use schema::UPLOAD_QUEUE_VERSIONED_SCHEMAS;
pub use state_machine::{transition, Event, FailureKind};
pub use store::{SqliteUploadStore, UploadStore};
