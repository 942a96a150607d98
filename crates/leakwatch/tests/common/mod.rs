//! Test Utilities for the leakwatch integration suite
//!
//! Every fixture runs on a `ManualClock` starting at 0 and a
//! `ManualScheduler`, so grace periods elapse only when a test says so.

#![allow(dead_code)]

use leakwatch::{
    EnabledFlag, ManualClock, ManualScheduler, RefWatcher, RetainedReference, WatchKey,
    WatcherConfig,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Grace period used by the scenarios (5 seconds)
pub const GRACE_PERIOD_MS: u64 = 5_000;

/// ============================================================================
/// WATCHER FIXTURE
/// ============================================================================

/// Watcher wired to a hand-driven clock and scheduler, recording every
/// retention notification.
pub struct WatcherFixture {
    pub watcher: RefWatcher,
    pub clock: ManualClock,
    pub scheduler: ManualScheduler,
    pub gate: EnabledFlag,
    pub notifications: Arc<Mutex<Vec<RetainedReference>>>,
}

impl WatcherFixture {
    pub fn new() -> Self {
        Self::with_config(WatcherConfig {
            watch_duration_ms: GRACE_PERIOD_MS,
            ..Default::default()
        })
    }

    pub fn with_config(config: WatcherConfig) -> Self {
        let clock = ManualClock::new(0);
        let scheduler = ManualScheduler::new(clock.clone());
        let gate = EnabledFlag::new(config.enabled);
        let notifications = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&notifications);
        let watcher = RefWatcher::builder(config)
            .clock(clock.clone())
            .scheduler(scheduler.clone())
            .gate(gate.clone())
            .listener(move |retained: &RetainedReference| {
                sink.lock().push(retained.clone());
            })
            .build()
            .expect("fixture config should be valid");

        Self {
            watcher,
            clock,
            scheduler,
            gate,
            notifications,
        }
    }

    /// Move the clock to `ms` and run every check that became due
    pub fn run_until(&self, ms: u64) -> usize {
        self.clock.set_ms(ms);
        self.scheduler.run_due()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.lock().len()
    }

    /// How many times each key was reported
    pub fn notifications_per_key(&self) -> HashMap<WatchKey, usize> {
        let mut counts = HashMap::new();
        for retained in self.notifications.lock().iter() {
            *counts.entry(retained.key).or_insert(0) += 1;
        }
        counts
    }
}

/// Stand-in for a host object with a lifecycle
#[derive(Debug)]
pub struct Screen {
    pub title: String,
}

pub fn screen(title: &str) -> Arc<Screen> {
    Arc::new(Screen {
        title: title.to_string(),
    })
}
