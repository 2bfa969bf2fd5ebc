//! Shared constants for the reader session.
//!
//! Timing values are expressed in milliseconds and converted to
//! `Duration` where they are consumed. The session configuration uses
//! these as defaults; callers may override them per deployment.
//!
//! # Usage
//!
//! ```
//! use cardtap_core::constants::*;
//! use std::time::Duration;
//!
//! let window = Duration::from_millis(DEBOUNCE_WINDOW_MS);
//! assert_eq!(window.as_secs(), 3);
//! assert_eq!(DEFAULT_HISTORY_CAPACITY, 10);
//! ```

// ============================================================================
// Scan Pipeline Timing
// ============================================================================

/// Window during which a repeat presentation of the same card is ignored.
pub const DEBOUNCE_WINDOW_MS: u64 = 3_000;

/// Pause after a debounced read before polling the reader again.
///
/// Keeps a card resting on the reader from turning the loop into a busy
/// poll.
pub const DEBOUNCE_PAUSE_MS: u64 = 500;

/// How long an accepted identifier stays on the device display.
pub const DISPLAY_DWELL_MS: u64 = 2_000;

/// Pause after an absorbed (non-fatal) scan error.
pub const SCAN_ERROR_PAUSE_MS: u64 = 500;

// ============================================================================
// Session Lifecycle Timing
// ============================================================================

/// Delay between a successful driver `initialize` and the liveness check.
pub const SETTLE_DELAY_MS: u64 = 300;

/// Backoff between failed initialization attempts.
pub const INIT_RETRY_DELAY_MS: u64 = 5_000;

/// Initialization attempts before the session gives up.
///
/// With the default backoff this is roughly five minutes of retrying.
pub const MAX_INIT_ATTEMPTS: u32 = 60;

/// Cooldown between a transport failure and the next initialization cycle.
pub const RECONNECT_COOLDOWN_MS: u64 = 5_000;

// ============================================================================
// Derived State
// ============================================================================

/// Number of scan records retained in the history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Value reported as the latest identifier before any card was accepted.
pub const NO_SCAN_SENTINEL: &str = "Waiting for scan...";

/// Device name reported while no reader is connected.
pub const UNKNOWN_READER_NAME: &str = "Unknown Reader";

// ============================================================================
// Persistence
// ============================================================================

/// File name of the scan history snapshot.
pub const HISTORY_FILE_NAME: &str = "history.json";

/// File name of the unique-identifier snapshot.
pub const UNIQUE_IDS_FILE_NAME: &str = "unique_uids.json";

// ============================================================================
// Export
// ============================================================================

/// Header line of the unique-identifier export.
pub const EXPORT_HEADER: &str = "UID";

/// Suggested file name for the unique-identifier export.
pub const EXPORT_FILE_NAME: &str = "uids_export.csv";
