//! Hand-driven scheduler for tests
//!
//! Tasks become due at `clock + delay` on a shared `ManualClock` and only run
//! when the test calls `run_due`, which makes grace-period scenarios exact.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{CheckScheduler, ScheduledTask};
use crate::clock::{Clock, ManualClock};

/// Scheduler whose tasks run only when asked to
///
/// Clones share the same task queue.
#[derive(Clone)]
pub struct ManualScheduler {
    clock: ManualClock,
    state: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    /// Keyed by (due time, submission order)
    tasks: BTreeMap<(u64, u64), ScheduledTask>,
    next_seq: u64,
}

impl ManualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(ManualState::default())),
        }
    }

    /// Run every task whose due time has been reached, earliest first
    ///
    /// Tasks run with the queue unlocked; a task that schedules another task
    /// already due gets it run in the same call. Returns how many ran.
    pub fn run_due(&self) -> usize {
        let mut ran = 0;

        while let Some(task) = self.pop_due() {
            task();
            ran += 1;
        }

        ran
    }

    /// Advance the clock by `ms` and run what became due
    pub fn advance_and_run(&self, ms: u64) -> usize {
        self.clock.advance_ms(ms);
        self.run_due()
    }

    pub fn pending_tasks(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Due time of the earliest queued task
    pub fn next_due_ms(&self) -> Option<u64> {
        self.state
            .lock()
            .tasks
            .first_key_value()
            .map(|(&(due, _), _)| due)
    }

    fn pop_due(&self) -> Option<ScheduledTask> {
        let now = self.clock.uptime_ms();
        let mut state = self.state.lock();

        match state.tasks.first_key_value() {
            Some((&(due, _), _)) if due <= now => state.tasks.pop_first().map(|(_, task)| task),
            _ => None,
        }
    }
}

impl CheckScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let due = self.clock.uptime_ms().saturating_add(delay_ms);

        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.tasks.insert((due, seq), task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_runs_only_when_due() {
        let clock = ManualClock::new(0);
        let scheduler = ManualScheduler::new(clock.clone());
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        scheduler.schedule(
            Duration::from_millis(5_000),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        // Nothing runs on the scheduling stack
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.next_due_ms(), Some(5_000));

        clock.set_ms(4_999);
        assert_eq!(scheduler.run_due(), 0);

        clock.set_ms(5_000);
        assert_eq!(scheduler.run_due(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_tasks(), 0);
    }

    #[test]
    fn test_due_order_and_nested_schedule() {
        let clock = ManualClock::new(0);
        let scheduler = ManualScheduler::new(clock);
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&order);
        let nested = scheduler.clone();
        scheduler.schedule(
            Duration::from_millis(20),
            Box::new(move || {
                log.lock().push("second");
                let log = Arc::clone(&log);
                nested.schedule(
                    Duration::ZERO,
                    Box::new(move || log.lock().push("nested")),
                );
            }),
        );
        let log = Arc::clone(&order);
        scheduler.schedule(Duration::from_millis(10), Box::new(move || log.lock().push("first")));

        assert_eq!(scheduler.advance_and_run(30), 3);
        assert_eq!(*order.lock(), vec!["first", "second", "nested"]);
    }
}
