//! Enable gate consulted by `watch`
//!
//! The gate is read once per `watch` call. When it reports false the call
//! does nothing at all: no reference, no scheduled check, no log line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait WatchGate: Send + Sync {
    fn is_enabled(&self) -> bool;
}

impl<F> WatchGate for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_enabled(&self) -> bool {
        self()
    }
}

/// Shared on/off switch
///
/// Clones share the same flag, so a host can keep one copy and flip it while
/// the watcher holds another.
#[derive(Debug, Clone)]
pub struct EnabledFlag {
    enabled: Arc<AtomicBool>,
}

impl EnabledFlag {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn enable(&self) {
        self.set(true);
    }

    pub fn disable(&self) {
        self.set(false);
    }
}

impl Default for EnabledFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl WatchGate for EnabledFlag {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}
