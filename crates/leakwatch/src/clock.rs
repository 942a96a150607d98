//! Uptime clocks
//!
//! Watch timestamps are read from a monotonic uptime clock so wall-clock
//! adjustments never shift them. The clock is injected into the watcher,
//! which lets tests drive time by hand with `ManualClock`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic source of uptime in milliseconds
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary, fixed origin. Never decreases.
    fn uptime_ms(&self) -> u64;
}

/// Uptime measured from the moment the clock was created
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn uptime_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven clock for tests
///
/// Clones share the same reading, so a test can keep one copy and give
/// another to the watcher or a `ManualScheduler`.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Jump to an absolute reading
    ///
    /// Readings never go backwards; an earlier value is ignored.
    pub fn set_ms(&self, ms: u64) {
        self.now_ms.fetch_max(ms, Ordering::AcqRel);
    }

    /// Move the clock forward by `ms` milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::AcqRel);
    }

    /// Move the clock forward by `duration`
    pub fn advance(&self, duration: Duration) {
        self.advance_ms(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));
    }
}

impl Clock for ManualClock {
    fn uptime_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Acquire)
    }
}
