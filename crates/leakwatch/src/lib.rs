//! # leakwatch - Retained Object Detection
//!
//! leakwatch detects objects that outlive their expected lifetime. A caller
//! hands the watcher an object it expects to be released soon, typically
//! right after some lifecycle event such as a screen closing or a session
//! ending. If the object is still strongly reachable once a grace period has
//! passed, the watcher reports it as retained: the classic signature of a leak
//! somewhere in the object graph.
//!
//! ## Overview
//!
//! - **Weak tracking**: watched objects are `Arc`s; the watcher keeps only a
//!   `Weak`, so watching never extends a lifetime
//! - **Reference queue**: released objects are reported on a queue that every
//!   operation drains first, so reads never see stale entries
//! - **Delayed check**: a host-supplied scheduler runs the retention check
//!   after the grace period; the check is idempotent
//! - **One lock**: all table state sits behind a single mutex
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use leakwatch::{RefWatcher, RetainedReference, WatcherConfig};
//!
//! fn main() -> Result<(), leakwatch::LeakWatchError> {
//!     let watcher = RefWatcher::builder(WatcherConfig::from_env())
//!         .listener(|retained: &RetainedReference| {
//!             eprintln!("{} is still alive", retained.type_name);
//!         })
//!         .build()?;
//!
//!     let session = Arc::new(String::from("session state"));
//!     watcher.watch(&session, "session");
//!
//!     // The session is supposed to be released here. If something still
//!     // holds it five seconds from now, the listener fires.
//!     drop(session);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────── RefWatcher ────────────────────────────┐
//! │  WatchGate ──► watch()                                             │
//! │                  │                                                 │
//! │                  ▼                                                 │
//! │  ┌──────────── Mutex<RetentionTable> ─────────────┐                │
//! │  │  pending  ──check_retained──►  retained        │                │
//! │  │     ▲                              ▲           │                │
//! │  │     └────── drain() ◄── ReferenceQueue ◄── ReferenceProcessor   │
//! │  └─────────────────────────────────────────────────┘               │
//! │                  │                                                 │
//! │  CheckScheduler ◄┘ (grace period)     RetentionListener ◄── retained│
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`watcher`]: the public detector API and its builder
//! - [`table`]: pending/retained bookkeeping and the queue drain
//! - [`reference`]: keyed weak references, the reference queue and processor
//! - [`scheduler`]: the scheduler bridge and its implementations
//! - [`clock`]: monotonic uptime clocks
//! - [`gate`]: the enable switch consulted by `watch`
//! - [`listener`]: retention notifications
//! - [`config`]: configuration and validation
//! - [`stats`]: lifetime counters
//! - [`error`]: error types
//!
//! ## Limitations
//!
//! - Only objects owned through `Arc` can be watched
//! - The watcher says *that* an object was retained, not *who* retains it

pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod listener;
pub mod reference;
pub mod scheduler;
pub mod stats;
pub mod table;
pub mod watcher;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, WatcherConfig};
pub use error::{LeakWatchError, Result};
pub use gate::{EnabledFlag, WatchGate};
pub use listener::{NoopListener, RetainedReference, RetentionListener};
pub use reference::{KeyedWeakReference, WatchKey};
pub use scheduler::{CheckScheduler, ManualScheduler, ScheduledTask, ThreadScheduler};
#[cfg(feature = "tokio")]
pub use scheduler::TokioScheduler;
pub use stats::WatcherStats;
pub use watcher::{RefWatcher, RefWatcherBuilder};

/// leakwatch version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build a watcher from environment configuration
///
/// Uses `WatcherConfig::from_env()`, a `ThreadScheduler`, a
/// `MonotonicClock` and no listener.
///
/// ```rust,no_run
/// let watcher = leakwatch::init()?;
/// assert!(!watcher.has_watched_references());
/// # Ok::<(), leakwatch::LeakWatchError>(())
/// ```
pub fn init() -> Result<RefWatcher> {
    RefWatcher::builder(WatcherConfig::from_env()).build()
}
