//! Retention Table
//!
//! The authoritative state of a watcher: two keyed maps, `pending` and
//! `retained`, plus the reference queue shared by every reference the table
//! creates.
//!
//! Invariants:
//! - a key is in at most one of the two maps
//! - every read and every mutation except `clear` and `remove_retained`
//!   drains the queue first, so a key whose object was released is gone by
//!   the time anyone looks
//!
//! The table does no locking of its own; `RefWatcher` keeps it behind one
//! mutex.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::listener::RetainedReference;
use crate::reference::{KeyedWeakReference, ReferenceProcessor, ReferenceQueue, WatchKey};
use crate::stats::WatcherStats;

/// Pending and retained references of one watcher
#[derive(Debug, Default)]
pub struct RetentionTable {
    /// Watched, grace period not over yet
    pending: IndexMap<WatchKey, KeyedWeakReference>,

    /// Watched, grace period over, object still alive at the last check
    retained: IndexMap<WatchKey, RetainedEntry>,

    queue: ReferenceQueue,
    processor: ReferenceProcessor,
    stats: WatcherStats,
}

#[derive(Debug)]
struct RetainedEntry {
    reference: KeyedWeakReference,
    retained_uptime_ms: u64,
}

impl RetentionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `target` under a fresh key
    pub fn watch<T>(&mut self, target: &Arc<T>, name: &str, watch_uptime_ms: u64) -> WatchKey
    where
        T: Any + Send + Sync,
    {
        self.drain();

        let mut key = WatchKey::random();
        while self.contains(&key) {
            key = WatchKey::random();
        }

        let reference = KeyedWeakReference::new(target, key, name, watch_uptime_ms, &self.queue);
        self.pending.insert(key, reference);
        self.stats.watched += 1;
        key
    }

    /// Move `key` from pending to retained if it is still pending
    ///
    /// Returns the snapshot to report, or `None` when the key was already
    /// reclaimed, already retained, or removed. Calling this twice for one
    /// key reports at most once.
    pub fn move_to_retained(
        &mut self,
        key: &WatchKey,
        retained_uptime_ms: u64,
    ) -> Option<RetainedReference> {
        self.drain();

        let reference = self.pending.shift_remove(key)?;
        let snapshot = RetainedReference::from_reference(&reference, retained_uptime_ms);
        self.retained.insert(
            *key,
            RetainedEntry {
                reference,
                retained_uptime_ms,
            },
        );
        self.stats.retained += 1;
        Some(snapshot)
    }

    pub fn has_retained(&mut self) -> bool {
        self.drain();
        !self.retained.is_empty()
    }

    pub fn has_watched(&mut self) -> bool {
        self.drain();
        !self.retained.is_empty() || !self.pending.is_empty()
    }

    /// Copy of the retained keys
    pub fn retained_keys(&mut self) -> HashSet<WatchKey> {
        self.drain();
        self.retained.keys().copied().collect()
    }

    /// Copy of the keys still inside their grace period
    pub fn pending_keys(&mut self) -> HashSet<WatchKey> {
        self.drain();
        self.pending.keys().copied().collect()
    }

    /// Snapshots of the retained references, in the order they were retained
    pub fn retained_references(&mut self) -> Vec<RetainedReference> {
        self.drain();
        self.retained
            .values()
            .map(|entry| {
                RetainedReference::from_reference(&entry.reference, entry.retained_uptime_ms)
            })
            .collect()
    }

    pub fn pending_count(&mut self) -> usize {
        self.drain();
        self.pending.len()
    }

    pub fn retained_count(&mut self) -> usize {
        self.drain();
        self.retained.len()
    }

    /// Drop the given keys from the retained set
    ///
    /// Keys that are not retained are ignored. Returns how many were removed.
    pub fn remove_retained<'a, I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'a WatchKey>,
    {
        let mut removed = 0;
        for key in keys {
            if self.retained.shift_remove(key).is_some() {
                removed += 1;
            }
        }
        self.stats.removed += removed as u64;
        removed
    }

    /// Forget everything, pending and retained
    ///
    /// Does not drain; keys already queued are ignored by the next drain.
    pub fn clear(&mut self) -> usize {
        let cleared = self.pending.len() + self.retained.len();
        self.pending.clear();
        self.retained.clear();
        self.stats.cleared += cleared as u64;
        cleared
    }

    pub fn stats(&self) -> WatcherStats {
        self.stats
    }

    /// Remove every reference whose object has been released
    ///
    /// The processor enqueues newly cleared references, then the queue is
    /// polled until empty. A reported key leaves `pending`, or `retained` if
    /// it had already been moved there. Returns how many keys were removed.
    pub fn drain(&mut self) -> usize {
        self.processor.process(
            self.pending
                .values()
                .chain(self.retained.values().map(|entry| &entry.reference)),
        );

        let mut removed = 0;
        while let Some(key) = self.queue.poll() {
            let was_tracked = self.pending.shift_remove(&key).is_some()
                || self.retained.shift_remove(&key).is_some();

            if was_tracked {
                log::trace!("Watched reference {} was reclaimed", key);
                removed += 1;
            }
        }

        self.stats.reclaimed += removed as u64;
        removed
    }

    fn contains(&self, key: &WatchKey) -> bool {
        self.pending.contains_key(key) || self.retained.contains_key(key)
    }

    #[cfg(test)]
    fn is_pending(&self, key: &WatchKey) -> bool {
        self.pending.contains_key(key)
    }

    #[cfg(test)]
    fn is_retained(&self, key: &WatchKey) -> bool {
        self.retained.contains_key(key)
    }
}
