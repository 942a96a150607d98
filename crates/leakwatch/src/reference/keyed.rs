//! KeyedWeakReference - a weak reference tagged with its watch key

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::key::WatchKey;
use super::queue::ReferenceQueue;

/// Weak reference to a watched object
///
/// Holds no strong count on the target. Everything except the one-shot
/// enqueue flag is fixed at creation, including the target's type name,
/// which is captured before the target can go away.
pub struct KeyedWeakReference {
    /// Weak pointer to the watched object
    referent: Weak<dyn Any + Send + Sync>,

    /// Unique key for this watch
    key: WatchKey,

    /// Caller-supplied label, possibly empty
    name: String,

    /// Clock reading at watch time
    watch_uptime_ms: u64,

    /// `std::any::type_name` of the target
    type_name: &'static str,

    /// Queue this reference reports to once cleared
    queue: ReferenceQueue,

    enqueued: AtomicBool,
}

impl KeyedWeakReference {
    /// Create a weak reference to `target` bound to `queue`
    pub fn new<T>(
        target: &Arc<T>,
        key: WatchKey,
        name: impl Into<String>,
        watch_uptime_ms: u64,
        queue: &ReferenceQueue,
    ) -> Self
    where
        T: Any + Send + Sync,
    {
        let weak: Weak<T> = Arc::downgrade(target);
        let referent: Weak<dyn Any + Send + Sync> = weak;

        Self {
            referent,
            key,
            name: name.into(),
            watch_uptime_ms,
            type_name: std::any::type_name::<T>(),
            queue: queue.clone(),
            enqueued: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> WatchKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn watch_uptime_ms(&self) -> u64 {
        self.watch_uptime_ms
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// True once no strong owner of the target remains
    pub fn is_cleared(&self) -> bool {
        self.referent.strong_count() == 0
    }

    pub fn is_enqueued(&self) -> bool {
        self.enqueued.load(Ordering::Acquire)
    }

    /// Report this reference on its bound queue
    ///
    /// Only the first call sends anything; later calls return false.
    pub fn enqueue(&self) -> bool {
        if self.enqueued.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.queue.enqueue(self.key)
    }
}

impl fmt::Debug for KeyedWeakReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedWeakReference")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("watch_uptime_ms", &self.watch_uptime_ms)
            .field("cleared", &self.is_cleared())
            .field("enqueued", &self.is_enqueued())
            .finish()
    }
}
