//! Watcher statistics
//!
//! Counters live inside the retention table and are only touched under the
//! watcher lock, so they are plain integers. `RefWatcher::stats` hands out
//! copies.

use serde::Serialize;

/// Lifetime counters for one watcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatcherStats {
    /// References added by `watch`
    pub watched: u64,
    /// Pending references moved to retained
    pub retained: u64,
    /// References dropped because their object was released
    pub reclaimed: u64,
    /// Retained keys acknowledged through `remove_retained_keys`
    pub removed: u64,
    /// References dropped by `clear_watched_references`
    pub cleared: u64,
}

impl WatcherStats {
    /// References still tracked, pending or retained
    pub fn live(&self) -> u64 {
        self.watched
            .saturating_sub(self.reclaimed)
            .saturating_sub(self.removed)
            .saturating_sub(self.cleared)
    }
}
