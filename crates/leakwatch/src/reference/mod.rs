//! Weak References Support
//!
//! A watched object is tracked through a `KeyedWeakReference`, which holds a
//! `Weak` to the object and therefore never keeps it alive. Every reference
//! is bound to one `ReferenceQueue` at creation. The `ReferenceProcessor`
//! plays the reclaimer: it finds references whose referent has lost its last
//! strong owner and enqueues them, so the watcher can drain the queue and
//! forget objects that were released in time.
//!
//! Lifecycle of one reference:
//!
//! ```text
//!   KeyedWeakReference::new ──► live ──(last Arc dropped)──► cleared
//!                                                              │
//!                                  ReferenceProcessor::process │
//!                                                              ▼
//!                               ReferenceQueue::poll ◄──── enqueued (once)
//! ```

pub mod key;
pub mod keyed;
pub mod processor;
pub mod queue;

pub use key::WatchKey;
pub use keyed::KeyedWeakReference;
pub use processor::ReferenceProcessor;
pub use queue::ReferenceQueue;
