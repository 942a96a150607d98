//! tokio-backed scheduler

use std::time::Duration;

use tokio::runtime::Handle;

use super::{CheckScheduler, ScheduledTask};

/// Runs retention checks as tasks on a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime of the calling context, if there is one
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl CheckScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}
