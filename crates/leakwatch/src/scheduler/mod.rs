//! Scheduler Bridge
//!
//! The watcher never owns a timer. It asks a `CheckScheduler` to run the
//! retention check for a key once the grace period has passed, and the host
//! decides where that runs: a dedicated timer thread, a tokio runtime, or a
//! hand-driven queue in tests.
//!
//! Contract:
//! - the task runs no earlier than `delay` after `schedule` was called
//! - the task never runs on the stack of the `schedule` call
//! - there is no cancellation; the retention check is idempotent, so a task
//!   that fires after its key is gone does nothing

pub mod manual;
pub mod thread;
#[cfg(feature = "tokio")]
pub mod tokio_rt;

pub use manual::ManualScheduler;
pub use thread::ThreadScheduler;
#[cfg(feature = "tokio")]
pub use tokio_rt::TokioScheduler;

use std::sync::Arc;
use std::time::Duration;

/// Deferred unit of work handed to a scheduler
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// "Run this after `delay`", supplied by the host environment
pub trait CheckScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: ScheduledTask);
}

impl<S: CheckScheduler + ?Sized> CheckScheduler for Arc<S> {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        (**self).schedule(delay, task)
    }
}
