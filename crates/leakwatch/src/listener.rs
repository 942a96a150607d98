//! Retention notifications
//!
//! The reporting layer subscribes with a `RetentionListener`. It is told
//! exactly once per watched object that outlives its grace period.

use serde::Serialize;

use crate::reference::{KeyedWeakReference, WatchKey};

/// Snapshot of a reference that was moved to the retained set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetainedReference {
    pub key: WatchKey,
    pub name: String,
    pub type_name: &'static str,
    /// Clock reading when `watch` was called
    pub watch_uptime_ms: u64,
    /// Clock reading when the retention check moved it
    pub retained_uptime_ms: u64,
}

impl RetainedReference {
    pub(crate) fn from_reference(reference: &KeyedWeakReference, retained_uptime_ms: u64) -> Self {
        Self {
            key: reference.key(),
            name: reference.name().to_string(),
            type_name: reference.type_name(),
            watch_uptime_ms: reference.watch_uptime_ms(),
            retained_uptime_ms,
        }
    }

    /// How long the object had been watched when it was found retained
    pub fn watched_for_ms(&self) -> u64 {
        self.retained_uptime_ms.saturating_sub(self.watch_uptime_ms)
    }
}

/// Receives pending-to-retained transitions
///
/// Called after the watcher has released its lock, so an implementation may
/// call back into the watcher, for example to read `retained_keys`.
pub trait RetentionListener: Send + Sync {
    fn on_reference_retained(&self, reference: &RetainedReference);
}

impl<F> RetentionListener for F
where
    F: Fn(&RetainedReference) + Send + Sync,
{
    fn on_reference_retained(&self, reference: &RetainedReference) {
        self(reference)
    }
}

/// Listener that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl RetentionListener for NoopListener {
    fn on_reference_retained(&self, _reference: &RetainedReference) {}
}
