//! Configuration Module - Watcher Tuning Parameters
//!
//! Holds the enable switch and the grace period a watched object is given
//! before it is reported as retained. The configuration is an explicit value
//! handed to `RefWatcherBuilder`; there is no process-wide config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration for a `RefWatcher`
///
/// # Examples
///
/// ```rust
/// use leakwatch::WatcherConfig;
///
/// // Use default configuration
/// let config = WatcherConfig::default();
///
/// // Shorter grace period for a test harness
/// let config = WatcherConfig {
///     watch_duration_ms: 250,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Whether `watch` records anything at all
    ///
    /// Seeds the default `EnabledFlag` gate. A host that needs to toggle
    /// watching at runtime passes its own gate to the builder.
    ///
    /// Default: true
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Grace period in milliseconds
    ///
    /// How long a watched object may stay strongly reachable before the
    /// retention check moves it to the retained set.
    ///
    /// Default: 5000ms
    #[serde(default = "default_watch_duration_ms")]
    pub watch_duration_ms: u64,

    /// Log watch and retain events at info level instead of debug
    ///
    /// Default: false
    #[serde(default)]
    pub verbose: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_watch_duration_ms() -> u64 {
    DEFAULT_WATCH_DURATION_MS
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherConfig {
            enabled: default_enabled(),
            watch_duration_ms: default_watch_duration_ms(),
            verbose: false,
        }
    }
}

impl WatcherConfig {
    /// Validate configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use leakwatch::WatcherConfig;
    ///
    /// let config = WatcherConfig {
    ///     watch_duration_ms: 0,  // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch_duration_ms == 0 {
            return Err(ConfigError::InvalidWatchDuration(
                "watch_duration_ms must be > 0".to_string(),
            ));
        }

        if self.watch_duration_ms > MAX_WATCH_DURATION_MS {
            return Err(ConfigError::InvalidWatchDuration(format!(
                "watch_duration_ms must be <= {}",
                MAX_WATCH_DURATION_MS
            )));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - LEAKWATCH_ENABLED
    /// - LEAKWATCH_WATCH_DURATION_MS
    /// - LEAKWATCH_VERBOSE
    ///
    /// Values that fail to parse are ignored.
    ///
    /// ```bash
    /// export LEAKWATCH_WATCH_DURATION_MS=10000
    /// export LEAKWATCH_ENABLED=false
    /// ```
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("LEAKWATCH_ENABLED") {
            if let Some(enabled) = parse_flag(&val) {
                config.enabled = enabled;
            }
        }

        if let Some(val) = lookup("LEAKWATCH_WATCH_DURATION_MS") {
            if let Ok(ms) = val.trim().parse::<u64>() {
                config.watch_duration_ms = ms;
            }
        }

        if let Some(val) = lookup("LEAKWATCH_VERBOSE") {
            if let Some(verbose) = parse_flag(&val) {
                config.verbose = verbose;
            }
        }

        config
    }

    /// Grace period as a `Duration`
    pub fn watch_duration(&self) -> Duration {
        Duration::from_millis(self.watch_duration_ms)
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    let val = val.trim();
    if val == "1" || val.eq_ignore_ascii_case("true") {
        Some(true)
    } else if val == "0" || val.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid watch duration: {0}")]
    InvalidWatchDuration(String),
}

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default grace period before a watched object counts as retained
pub const DEFAULT_WATCH_DURATION_MS: u64 = 5_000;

/// Upper bound on the grace period (one hour)
const MAX_WATCH_DURATION_MS: u64 = 60 * 60 * 1_000;
