//! ReferenceQueue - notification queue for cleared references

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

use super::key::WatchKey;

/// Delivery channel for references whose referent lost its last strong owner
///
/// Clones share one underlying channel, which is how every reference created
/// by one watcher reports to the same queue. Polling never blocks.
#[derive(Debug, Clone)]
pub struct ReferenceQueue {
    sender: Sender<WatchKey>,
    receiver: Receiver<WatchKey>,
}

impl ReferenceQueue {
    /// Create new reference queue
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self { sender, receiver }
    }

    /// Enqueue the key of a cleared reference
    pub fn enqueue(&self, key: WatchKey) -> bool {
        self.sender.send(key).is_ok()
    }

    /// Poll for an enqueued key
    ///
    /// Returns `None` immediately when nothing is queued.
    pub fn poll(&self) -> Option<WatchKey> {
        match self.receiver.try_recv() {
            Ok(key) => Some(key),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get queue size
    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for ReferenceQueue {
    fn default() -> Self {
        Self::new()
    }
}
