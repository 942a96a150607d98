//! Error Module - leakwatch Error Types
//!
//! The retention engine itself never fails: watching a disabled detector,
//! removing a key twice, or running a check for a key that was already
//! reclaimed are all silent no-ops. Errors only come from building a watcher.
//!
//! # Error Categories
//!
//! ## Construction Errors
//! - `Configuration` - Invalid `WatcherConfig`
//! - `SchedulerSpawn` - The timer thread could not be started
//!
//! ## Runtime Errors
//! - `SchedulerStopped` - A scheduler was used after shutdown

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for leakwatch operations
///
/// # Examples
///
/// ```rust
/// use leakwatch::error::LeakWatchError;
///
/// fn handle_error(err: LeakWatchError) {
///     match err {
///         LeakWatchError::Configuration(inner) => {
///             eprintln!("bad watcher config: {}", inner);
///         }
///         _ => {
///             eprintln!("Other error: {}", err);
///         }
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum LeakWatchError {
    /// Configuration error
    ///
    /// **When returned:** `WatcherConfig::validate` rejected the configuration
    ///
    /// **Recovery strategy:** Use default configuration or fail fast
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Timer thread spawn failed
    ///
    /// **When returned:** `ThreadScheduler::start` could not spawn its thread
    ///
    /// **Recovery strategy:** Supply a host scheduler instead
    #[error("Failed to spawn scheduler thread: {0}")]
    SchedulerSpawn(#[source] std::io::Error),

    /// Scheduler already shut down
    ///
    /// **When returned:** `ThreadScheduler::try_schedule` after `shutdown`
    ///
    /// **Recovery strategy:** None; the task is dropped
    #[error("Scheduler has been shut down")]
    SchedulerStopped,
}

impl LeakWatchError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LeakWatchError::SchedulerSpawn(_))
    }
}

/// Result type alias for leakwatch operations
pub type Result<T> = std::result::Result<T, LeakWatchError>;
