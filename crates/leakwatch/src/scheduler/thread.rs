//! Timer thread scheduler
//!
//! One dedicated thread sleeps until the earliest deadline in a min-heap,
//! runs whatever is due, and goes back to sleep. Tasks run with the heap
//! unlocked, so a task may schedule further tasks.
//!
//! ```text
//! schedule() ──push──► [ BinaryHeap<TimerEntry> ] ◄──peek/pop── timer thread
//!      │                                                          ▲
//!      └────────────────────── Condvar::notify_one ───────────────┘
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::{CheckScheduler, ScheduledTask};
use crate::error::{LeakWatchError, Result};

const THREAD_NAME: &str = "leakwatch-timer";

/// Stand-in delay for deadlines `Instant` cannot represent (about 100 years)
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Scheduler backed by a single timer thread
///
/// The thread stops on `shutdown` or when the scheduler is dropped; tasks
/// still queued at that point are dropped without running.
pub struct ThreadScheduler {
    shared: Arc<TimerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct TimerShared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
}

struct TimerState {
    queue: BinaryHeap<TimerEntry>,
    next_seq: u64,
    running: bool,
}

struct TimerEntry {
    deadline: Instant,
    /// Tie-breaker keeping equal deadlines in submission order
    seq: u64,
    task: ScheduledTask,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    // Reversed: BinaryHeap is a max-heap and the earliest deadline must win.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl ThreadScheduler {
    /// Spawn the timer thread
    pub fn start() -> Result<Self> {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                queue: BinaryHeap::new(),
                next_seq: 0,
                running: true,
            }),
            wakeup: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run_timer(thread_shared))
            .map_err(LeakWatchError::SchedulerSpawn)?;

        log::debug!("Started {} thread", THREAD_NAME);

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queue `task` to run after `delay`
    ///
    /// Fails with `SchedulerStopped` once `shutdown` has been called.
    pub fn try_schedule(&self, delay: Duration, task: ScheduledTask) -> Result<()> {
        let mut state = self.shared.state.lock();
        if !state.running {
            return Err(LeakWatchError::SchedulerStopped);
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push(TimerEntry {
            deadline: deadline_after(delay),
            seq,
            task,
        });
        drop(state);

        self.shared.wakeup.notify_one();
        Ok(())
    }

    /// Number of tasks waiting for their deadline
    pub fn pending_tasks(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Stop the timer thread and drop queued tasks
    ///
    /// Waits for a task that is currently running to finish, unless called
    /// from inside a task.
    pub fn shutdown(&self) {
        let dropped = {
            let mut state = self.shared.state.lock();
            state.running = false;
            let dropped = state.queue.len();
            state.queue.clear();
            dropped
        };
        self.shared.wakeup.notify_all();

        if let Some(handle) = self.handle.lock().take() {
            if handle.thread().id() != std::thread::current().id() && handle.join().is_err() {
                log::error!("{} thread panicked", THREAD_NAME);
            }
        }

        if dropped > 0 {
            log::debug!("{} shut down, dropped {} pending tasks", THREAD_NAME, dropped);
        }
    }
}

impl CheckScheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        if let Err(err) = self.try_schedule(delay, task) {
            log::warn!("Dropping retention check: {}", err);
        }
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_timer(shared: Arc<TimerShared>) {
    let mut state = shared.state.lock();

    while state.running {
        let next_deadline = state.queue.peek().map(|entry| entry.deadline);

        match next_deadline {
            Some(deadline) if deadline <= Instant::now() => {
                if let Some(entry) = state.queue.pop() {
                    MutexGuard::unlocked(&mut state, || run_task(entry.task));
                }
            }
            Some(deadline) => {
                shared.wakeup.wait_until(&mut state, deadline);
            }
            None => {
                shared.wakeup.wait(&mut state);
            }
        }
    }
}

/// `now + delay`, saturating at a far-future deadline instead of overflowing
fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

fn run_task(task: ScheduledTask) {
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        log::error!("Scheduled task panicked on {} thread", THREAD_NAME);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_runs_after_delay() {
        let scheduler = ThreadScheduler::start().expect("timer thread should start");
        let (tx, rx) = mpsc::channel();
        let scheduled_at = Instant::now();

        scheduler.schedule(
            Duration::from_millis(30),
            Box::new(move || {
                let _ = tx.send(Instant::now());
            }),
        );

        let ran_at = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("task should run");
        assert!(ran_at.duration_since(scheduled_at) >= Duration::from_millis(30));
    }

    #[test]
    fn test_runs_in_deadline_order() {
        let scheduler = ThreadScheduler::start().expect("timer thread should start");
        let (tx, rx) = mpsc::channel();

        for (label, delay) in [("late", 60u64), ("early", 10), ("middle", 30)] {
            let tx = tx.clone();
            scheduler.schedule(
                Duration::from_millis(delay),
                Box::new(move || {
                    let _ = tx.send(label);
                }),
            );
        }

        let order: Vec<&str> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).expect("task should run"))
            .collect();
        assert_eq!(order, vec!["early", "middle", "late"]);
    }

    #[test]
    fn test_not_on_caller_stack() {
        let scheduler = ThreadScheduler::start().expect("timer thread should start");
        let (tx, rx) = mpsc::channel();
        let caller = std::thread::current().id();

        scheduler.schedule(
            Duration::ZERO,
            Box::new(move || {
                let _ = tx.send(std::thread::current().id());
            }),
        );

        let runner = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("task should run");
        assert_ne!(runner, caller);
    }

    #[test]
    fn test_survives_panicking_task() {
        let scheduler = ThreadScheduler::start().expect("timer thread should start");
        let (tx, rx) = mpsc::channel();

        scheduler.schedule(Duration::ZERO, Box::new(|| panic!("task failure")));
        scheduler.schedule(
            Duration::from_millis(5),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(scheduler.is_running());
    }

    #[test]
    fn test_unrepresentable_delay_saturates() {
        let scheduler = ThreadScheduler::start().expect("timer thread should start");
        let (tx, rx) = mpsc::channel();

        scheduler.schedule(Duration::MAX, Box::new(|| panic!("must never run")));
        assert!(scheduler
            .try_schedule(Duration::MAX, Box::new(|| {}))
            .is_ok());
        scheduler.schedule(
            Duration::from_millis(5),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );

        // The short task still runs ahead of the saturated ones
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(scheduler.is_running());
        assert_eq!(scheduler.pending_tasks(), 2);
    }

    #[test]
    fn test_deadline_after_saturates() {
        let before = Instant::now();
        assert!(deadline_after(Duration::MAX) >= before + Duration::from_secs(60));
        assert!(deadline_after(Duration::from_millis(10)) >= before + Duration::from_millis(10));
    }

    #[test]
    fn test_shutdown_rejects_new_tasks() {
        let scheduler = ThreadScheduler::start().expect("timer thread should start");
        scheduler.schedule(Duration::from_secs(60), Box::new(|| {}));
        assert_eq!(scheduler.pending_tasks(), 1);

        scheduler.shutdown();

        assert!(!scheduler.is_running());
        assert_eq!(scheduler.pending_tasks(), 0);
        assert!(matches!(
            scheduler.try_schedule(Duration::ZERO, Box::new(|| {})),
            Err(LeakWatchError::SchedulerStopped)
        ));
    }
}
