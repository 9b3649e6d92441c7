//! Change notification for upload queue observers.
//!
//! A thin wrapper over a tokio broadcast channel. Observers subscribe and
//! re-query the queue when a change lands; the event itself carries no
//! record data, so a lagging or dropped receiver can never corrupt state.

use tokio::sync::broadcast;
use tracing::debug;

/// Emitted after any mutating queue operation that changed at least one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueChange;

pub struct ChangeNotifier {
    sender: broadcast::Sender<QueueChange>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to queue changes. Dropping the receiver unsubscribes.
    ///
    /// The channel is lossy: a receiver that falls more than `capacity`
    /// events behind observes `RecvError::Lagged` and should simply
    /// re-query, since events carry no payload.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueChange> {
        self.sender.subscribe()
    }

    /// Emit one change event if `rows_affected > 0`. Never blocks; a send
    /// error just means nobody is currently listening.
    pub fn notify(&self, rows_affected: usize) {
        if rows_affected == 0 {
            return;
        }
        if self.sender.send(QueueChange).is_err() {
            debug!("Queue changed with no subscribers");
        }
    }

    #[cfg(test)]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
