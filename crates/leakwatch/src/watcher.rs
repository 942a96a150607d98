//! RefWatcher - the public detector API
//!
//! Wraps the `RetentionTable` in a single mutex and wires it to the injected
//! clock, scheduler, gate and listener.
//!
//! ```text
//! watch(obj) ──► [lock] drain, insert pending [unlock] ──► scheduler.schedule(grace)
//!                                                                 │
//!                                                         (grace period later)
//!                                                                 ▼
//! listener ◄── [unlock] ◄── drain, pending ─► retained ◄── [lock] check_retained(key)
//! ```
//!
//! One coarse lock guards both maps and the queue drain. Watch and check
//! calls follow application lifecycle events, so contention stays low.

use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::clock::{Clock, MonotonicClock};
use crate::config::WatcherConfig;
use crate::error::Result;
use crate::gate::{EnabledFlag, WatchGate};
use crate::listener::{NoopListener, RetainedReference, RetentionListener};
use crate::reference::WatchKey;
use crate::scheduler::{CheckScheduler, ThreadScheduler};
use crate::stats::WatcherStats;
use crate::table::RetentionTable;

/// Leak detector handle
///
/// Cloning is cheap and every clone refers to the same table. Retention
/// checks scheduled by a watcher hold only a weak link to it; once every
/// clone is dropped, late checks do nothing.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use leakwatch::{ManualClock, ManualScheduler, RefWatcher, WatcherConfig};
///
/// let clock = ManualClock::new(0);
/// let scheduler = ManualScheduler::new(clock.clone());
/// let watcher = RefWatcher::builder(WatcherConfig::default())
///     .clock(clock.clone())
///     .scheduler(scheduler.clone())
///     .build()?;
///
/// let screen = Arc::new(String::from("settings screen"));
/// let key = watcher.watch(&screen, "settings").expect("watcher is enabled");
///
/// scheduler.advance_and_run(5_001);
/// assert!(watcher.retained_keys().contains(&key));
/// # Ok::<(), leakwatch::LeakWatchError>(())
/// ```
#[derive(Clone)]
pub struct RefWatcher {
    shared: Arc<Shared>,
}

struct Shared {
    table: Mutex<RetentionTable>,
    config: WatcherConfig,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn CheckScheduler>,
    listener: Arc<dyn RetentionListener>,
    gate: Arc<dyn WatchGate>,
}

impl RefWatcher {
    pub fn builder(config: WatcherConfig) -> RefWatcherBuilder {
        RefWatcherBuilder::new(config)
    }

    /// Watch `target`, expecting it to become unreachable soon
    ///
    /// Returns the key assigned to this watch, or `None` when the gate is
    /// disabled, in which case nothing at all happens. Never blocks on the
    /// retention check.
    pub fn watch<T>(&self, target: &Arc<T>, name: &str) -> Option<WatchKey>
    where
        T: Any + Send + Sync,
    {
        if !self.shared.gate.is_enabled() {
            return None;
        }

        let watch_uptime_ms = self.shared.clock.uptime_ms();
        let key = self.shared.table.lock().watch(target, name, watch_uptime_ms);

        let type_name = std::any::type_name::<T>();
        if self.shared.config.verbose {
            log_watch(log::Level::Info, type_name, name, key);
        } else {
            log_watch(log::Level::Debug, type_name, name, key);
        }

        let watcher = Arc::downgrade(&self.shared);
        self.shared.scheduler.schedule(
            self.shared.config.watch_duration(),
            Box::new(move || check_retained(&watcher, key)),
        );

        Some(key)
    }

    /// Same as `watch` with an empty name
    pub fn watch_unnamed<T>(&self, target: &Arc<T>) -> Option<WatchKey>
    where
        T: Any + Send + Sync,
    {
        self.watch(target, "")
    }

    /// True if any watched object outlived its grace period and is still alive
    pub fn has_retained_references(&self) -> bool {
        self.shared.table.lock().has_retained()
    }

    /// True if anything is still being tracked, pending or retained
    pub fn has_watched_references(&self) -> bool {
        self.shared.table.lock().has_watched()
    }

    /// Keys of the objects currently considered retained
    ///
    /// The set is a copy; changing it does not affect the watcher.
    pub fn retained_keys(&self) -> HashSet<WatchKey> {
        self.shared.table.lock().retained_keys()
    }

    /// Details of the retained objects, in the order they were retained
    pub fn retained_references(&self) -> Vec<RetainedReference> {
        self.shared.table.lock().retained_references()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.table.lock().pending_count()
    }

    pub fn retained_count(&self) -> usize {
        self.shared.table.lock().retained_count()
    }

    /// Acknowledge retained keys so they are not reported again
    ///
    /// Unknown keys and keys that are still pending are ignored.
    pub fn remove_retained_keys(&self, keys: &HashSet<WatchKey>) {
        let removed = self.shared.table.lock().remove_retained(keys);
        log::debug!("Removed {} of {} retained keys", removed, keys.len());
    }

    /// Forget every watched reference, pending and retained
    pub fn clear_watched_references(&self) {
        let cleared = self.shared.table.lock().clear();
        log::debug!("Cleared {} watched references", cleared);
    }

    /// Run the retention check for `key` now
    ///
    /// Only the scheduled task calls this, once the grace period is over.
    /// Returns true if this call moved the key to the retained set.
    pub(crate) fn check_retained(&self, key: WatchKey) -> bool {
        self.shared.check_retained(key)
    }

    pub fn stats(&self) -> WatcherStats {
        self.shared.table.lock().stats()
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.shared.config
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.gate.is_enabled()
    }
}

impl std::fmt::Debug for RefWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefWatcher")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Shared {
    fn check_retained(&self, key: WatchKey) -> bool {
        let now = self.clock.uptime_ms();
        let retained = self.table.lock().move_to_retained(&key, now);

        // Listener runs unlocked; the move above already made this one-shot.
        match retained {
            Some(reference) => {
                let level = if self.config.verbose {
                    log::Level::Info
                } else {
                    log::Level::Debug
                };
                log::log!(
                    level,
                    "Retained instance of {} named {:?} with key {} after {}ms",
                    reference.type_name,
                    reference.name,
                    reference.key,
                    reference.watched_for_ms()
                );
                self.listener.on_reference_retained(&reference);
                true
            }
            None => false,
        }
    }
}

fn check_retained(watcher: &Weak<Shared>, key: WatchKey) {
    if let Some(shared) = watcher.upgrade() {
        shared.check_retained(key);
    }
}

fn log_watch(level: log::Level, type_name: &str, name: &str, key: WatchKey) {
    if name.is_empty() {
        log::log!(level, "Watching instance of {} with key {}", type_name, key);
    } else {
        log::log!(
            level,
            "Watching instance of {} named {} with key {}",
            type_name,
            name,
            key
        );
    }
}

/// Assembles a `RefWatcher`
///
/// Defaults: `MonotonicClock`, a freshly started `ThreadScheduler`,
/// `NoopListener`, and an `EnabledFlag` seeded from `config.enabled`.
pub struct RefWatcherBuilder {
    config: WatcherConfig,
    clock: Option<Arc<dyn Clock>>,
    scheduler: Option<Arc<dyn CheckScheduler>>,
    listener: Option<Arc<dyn RetentionListener>>,
    gate: Option<Arc<dyn WatchGate>>,
}

impl RefWatcherBuilder {
    pub fn new(config: WatcherConfig) -> Self {
        Self {
            config,
            clock: None,
            scheduler: None,
            listener: None,
            gate: None,
        }
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn scheduler(mut self, scheduler: impl CheckScheduler + 'static) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    pub fn listener(mut self, listener: impl RetentionListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Replace the default gate, e.g. with a host-owned `EnabledFlag`
    pub fn gate(mut self, gate: impl WatchGate + 'static) -> Self {
        self.gate = Some(Arc::new(gate));
        self
    }

    /// Validate the configuration and build the watcher
    pub fn build(self) -> Result<RefWatcher> {
        self.config.validate()?;

        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(ThreadScheduler::start()?),
        };
        let gate = self
            .gate
            .unwrap_or_else(|| Arc::new(EnabledFlag::new(self.config.enabled)));

        log::debug!(
            "Installing RefWatcher (enabled: {}, watch duration: {}ms)",
            self.config.enabled,
            self.config.watch_duration_ms
        );

        Ok(RefWatcher {
            shared: Arc::new(Shared {
                table: Mutex::new(RetentionTable::new()),
                clock: self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new())),
                scheduler,
                listener: self.listener.unwrap_or_else(|| Arc::new(NoopListener)),
                gate,
                config: self.config,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::scheduler::ManualScheduler;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manual_watcher() -> (RefWatcher, ManualScheduler, Arc<AtomicUsize>) {
        let clock = ManualClock::new(0);
        let scheduler = ManualScheduler::new(clock.clone());
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);

        let watcher = RefWatcher::builder(WatcherConfig::default())
            .clock(clock)
            .scheduler(scheduler.clone())
            .listener(move |_: &RetainedReference| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .expect("default config is valid");

        (watcher, scheduler, notified)
    }

    #[test]
    fn test_watch_schedules_one_check() {
        let (watcher, scheduler, _) = manual_watcher();
        let target = Arc::new(1u8);

        watcher.watch(&target, "byte");

        assert_eq!(scheduler.pending_tasks(), 1);
        assert_eq!(scheduler.next_due_ms(), Some(5_000));
    }

    #[test]
    fn test_check_retained_twice_notifies_once() {
        let (watcher, _, notified) = manual_watcher();
        let target = Arc::new(1u8);
        let key = watcher.watch(&target, "").expect("enabled");

        assert!(watcher.check_retained(key));
        assert!(!watcher.check_retained(key));
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = RefWatcher::builder(WatcherConfig {
            watch_duration_ms: 0,
            ..Default::default()
        })
        .scheduler(ManualScheduler::new(ManualClock::new(0)))
        .build();

        assert!(matches!(
            result,
            Err(crate::error::LeakWatchError::Configuration(_))
        ));
    }

    #[test]
    fn test_disabled_config_seeds_gate() {
        let watcher = RefWatcher::builder(WatcherConfig {
            enabled: false,
            ..Default::default()
        })
        .scheduler(ManualScheduler::new(ManualClock::new(0)))
        .build()
        .expect("config is valid");

        assert!(!watcher.is_enabled());
        assert!(watcher.watch(&Arc::new(0u32), "ignored").is_none());
    }

    #[test]
    fn test_concurrent_checks_notify_once() {
        let (watcher, _, notified) = manual_watcher();
        let targets: Vec<_> = (0..64u32).map(Arc::new).collect();
        let keys: Arc<Vec<WatchKey>> = Arc::new(
            targets
                .iter()
                .map(|t| watcher.watch(t, "").expect("enabled"))
                .collect(),
        );
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let watcher = watcher.clone();
                let keys = Arc::clone(&keys);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    keys.iter().filter(|&&key| watcher.check_retained(key)).count()
                })
            })
            .collect();

        let moved: usize = handles
            .into_iter()
            .map(|h| h.join().expect("check thread should not panic"))
            .sum();

        assert_eq!(moved, keys.len());
        assert_eq!(notified.load(Ordering::SeqCst), keys.len());
        assert_eq!(watcher.retained_count(), keys.len());
        drop(targets);
    }

    #[test]
    fn test_check_after_watcher_dropped_is_noop() {
        let (watcher, scheduler, notified) = manual_watcher();
        let target = Arc::new(1u8);
        watcher.watch(&target, "");

        drop(watcher);

        assert_eq!(scheduler.advance_and_run(5_000), 1);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }
}
