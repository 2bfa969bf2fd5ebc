//! Session timing and capacity configuration.

use std::time::Duration;

use cardtap_core::constants::{
    DEBOUNCE_PAUSE_MS, DEBOUNCE_WINDOW_MS, DEFAULT_HISTORY_CAPACITY, DISPLAY_DWELL_MS,
    INIT_RETRY_DELAY_MS, MAX_INIT_ATTEMPTS, RECONNECT_COOLDOWN_MS, SCAN_ERROR_PAUSE_MS,
    SETTLE_DELAY_MS, UNKNOWN_READER_NAME,
};
use cardtap_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tunables for a reader session.
///
/// Defaults match the reader service's production timings.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cardtap_session::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_max_init_attempts(5)
///     .with_init_retry_delay(Duration::from_secs(1));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_init_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Wait between `initialize()` and the liveness check.
    pub settle_delay: Duration,

    /// Wait between failed initialization attempts.
    pub init_retry_delay: Duration,

    /// Initialization attempts per cycle before the session gives up.
    pub max_init_attempts: u32,

    /// Wait between losing the reader and starting a new cycle.
    pub reconnect_cooldown: Duration,

    /// Interval during which a repeat presentation of the same card is ignored.
    pub debounce_window: Duration,

    /// Pause after an ignored repeat presentation.
    pub debounce_pause: Duration,

    /// How long an accepted identifier stays on the display.
    pub display_dwell: Duration,

    /// Pause after an absorbed scan error.
    pub error_pause: Duration,

    /// Number of recent scans kept in the history.
    pub history_capacity: usize,

    /// Device name reported when the reader does not provide one.
    pub fallback_device_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
            init_retry_delay: Duration::from_millis(INIT_RETRY_DELAY_MS),
            max_init_attempts: MAX_INIT_ATTEMPTS,
            reconnect_cooldown: Duration::from_millis(RECONNECT_COOLDOWN_MS),
            debounce_window: Duration::from_millis(DEBOUNCE_WINDOW_MS),
            debounce_pause: Duration::from_millis(DEBOUNCE_PAUSE_MS),
            display_dwell: Duration::from_millis(DISPLAY_DWELL_MS),
            error_pause: Duration::from_millis(SCAN_ERROR_PAUSE_MS),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            fallback_device_name: UNKNOWN_READER_NAME.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_init_retry_delay(mut self, delay: Duration) -> Self {
        self.init_retry_delay = delay;
        self
    }

    pub fn with_max_init_attempts(mut self, attempts: u32) -> Self {
        self.max_init_attempts = attempts;
        self
    }

    pub fn with_reconnect_cooldown(mut self, cooldown: Duration) -> Self {
        self.reconnect_cooldown = cooldown;
        self
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    pub fn with_debounce_pause(mut self, pause: Duration) -> Self {
        self.debounce_pause = pause;
        self
    }

    pub fn with_display_dwell(mut self, dwell: Duration) -> Self {
        self.display_dwell = dwell;
        self
    }

    pub fn with_error_pause(mut self, pause: Duration) -> Self {
        self.error_pause = pause;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_fallback_device_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_device_name = name.into();
        self
    }

    /// Check that the configuration can drive a session.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the retry budget or the history capacity
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_init_attempts == 0 {
            return Err(Error::Config(
                "max_init_attempts must be at least 1".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(Error::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
