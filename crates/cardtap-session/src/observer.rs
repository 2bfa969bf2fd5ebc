//! Notification seam for accepted scans.
//!
//! Observers are told about every accepted scan after it has been recorded
//! and persisted. They run inline in the scan loop, so they must not block;
//! anything slow belongs on the other side of a channel.

use cardtap_core::ScanRecord;
use tokio::sync::mpsc;

/// An accepted card presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    /// The record added to the history.
    pub record: ScanRecord,

    /// Tap counter after this scan.
    pub tap_count: u64,

    /// Whether this scan changed the latest identifier.
    pub new_tap: bool,

    /// Whether the identifier had never been seen before.
    pub first_seen: bool,
}

/// Receives accepted scans, e.g. a clipboard or terminal sink.
pub trait ScanObserver: Send + Sync {
    fn on_scan(&self, event: &ScanEvent);
}

impl ScanObserver for mpsc::UnboundedSender<ScanEvent> {
    fn on_scan(&self, event: &ScanEvent) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.send(event.clone());
    }
}
