//! Derived scan statistics and their persistence.
//!
//! [`ScanLedger`] is the pure bookkeeping: debounce window, tap counter,
//! latest identifier, bounded history and the unique-identifier set.
//! [`Ledger`] wraps it in a mutex together with the snapshot store so that
//! deciding, updating and persisting a scan happen as one step with
//! respect to concurrent commands such as clearing the history.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cardtap_core::constants::EXPORT_HEADER;
use cardtap_core::{CardIdentifier, History, ScanRecord, UniqueIdentifierSet};
use cardtap_storage::{SnapshotStore, StorageResult};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use crate::error::ExportError;
use crate::observer::ScanEvent;

/// Last observed identifier for debounce decisions. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DedupWindow {
    identifier: CardIdentifier,
    observed_at: DateTime<Utc>,
}

/// In-memory scan bookkeeping.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cardtap_core::CardIdentifier;
/// use cardtap_session::ScanLedger;
/// use chrono::Utc;
///
/// let mut ledger = ScanLedger::new(10, Duration::from_secs(3));
/// let card = CardIdentifier::parse("04ABCDEF").unwrap();
/// let now = Utc::now();
///
/// assert!(ledger.observe(card.clone(), now).is_some());
/// // The same card again inside the window is ignored.
/// assert!(ledger.observe(card, now).is_none());
/// assert_eq!(ledger.tap_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ScanLedger {
    history: History,
    unique: UniqueIdentifierSet,
    dedup: Option<DedupWindow>,
    latest: Option<CardIdentifier>,
    tap_count: u64,
    debounce_window: TimeDelta,
}

impl ScanLedger {
    pub fn new(history_capacity: usize, debounce_window: Duration) -> Self {
        Self {
            history: History::with_capacity(history_capacity),
            unique: UniqueIdentifierSet::new(),
            dedup: None,
            latest: None,
            tap_count: 0,
            debounce_window: TimeDelta::from_std(debounce_window).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Replace history and unique set with persisted snapshots.
    ///
    /// The latest identifier is taken from the history head. Identifiers
    /// in the history that the unique snapshot lacks (a missing or corrupt
    /// document) are added to the set; the number added is returned. The
    /// tap counter and debounce window are left as they are.
    pub fn restore(&mut self, history: Vec<ScanRecord>, unique: Vec<CardIdentifier>) -> usize {
        self.history = History::from_records(history, self.history.capacity());
        self.unique = unique.into_iter().collect();
        self.latest = self.history.latest().map(|record| record.uid.clone());

        let mut added = 0;
        for record in self.history.iter() {
            if self.unique.insert(record.uid.clone()) {
                added += 1;
            }
        }
        added
    }

    /// Apply one card presentation observed at `now`.
    ///
    /// Returns `None` when the presentation repeats the last observed card
    /// within the debounce window; nothing changes in that case.
    pub fn observe(&mut self, identifier: CardIdentifier, now: DateTime<Utc>) -> Option<ScanEvent> {
        if let Some(window) = &self.dedup
            && window.identifier == identifier
            && now - window.observed_at < self.debounce_window
        {
            return None;
        }

        self.dedup = Some(DedupWindow {
            identifier: identifier.clone(),
            observed_at: now,
        });

        let new_tap = self.latest.as_ref() != Some(&identifier);
        if new_tap {
            self.tap_count += 1;
        }
        self.latest = Some(identifier.clone());

        let record = ScanRecord::new(identifier.clone(), now);
        self.history.push(record.clone());
        let first_seen = self.unique.insert(identifier);

        Some(ScanEvent {
            record,
            tap_count: self.tap_count,
            new_tap,
            first_seen,
        })
    }

    /// Empty the history. Unique set, tap counter and latest identifier
    /// are kept.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn latest(&self) -> Option<&CardIdentifier> {
        self.latest.as_ref()
    }

    pub fn tap_count(&self) -> u64 {
        self.tap_count
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn unique(&self) -> &UniqueIdentifierSet {
        &self.unique
    }

    /// Render the unique set as CSV: a `UID` header, one identifier per line.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::NothingToExport` when the set is empty.
    pub fn export_csv(&self) -> Result<String, ExportError> {
        if self.unique.is_empty() {
            return Err(ExportError::NothingToExport);
        }

        let mut csv = String::with_capacity((self.unique.len() + 1) * 16);
        csv.push_str(EXPORT_HEADER);
        csv.push('\n');
        for id in self.unique.iter() {
            csv.push_str(id.as_str());
            csv.push('\n');
        }
        Ok(csv)
    }
}

/// Shared, persisted scan ledger.
///
/// The ledger is the only writer to its store. Save failures are logged
/// and leave the in-memory state as the source of truth.
pub struct Ledger {
    inner: Mutex<ScanLedger>,
    store: Arc<dyn SnapshotStore>,
    restored: AtomicBool,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("inner", &*self.lock())
            .field("restored", &self.restored.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Ledger {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        history_capacity: usize,
        debounce_window: Duration,
    ) -> Self {
        Self {
            inner: Mutex::new(ScanLedger::new(history_capacity, debounce_window)),
            store,
            restored: AtomicBool::new(false),
        }
    }

    /// Load persisted snapshots, once per ledger.
    ///
    /// Returns `false` without touching the store if a restore already
    /// happened; later reconnections keep the in-memory state.
    pub fn restore_once(&self) -> bool {
        if self.restored.swap(true, Ordering::SeqCst) {
            return false;
        }

        let history = self.store.load_history();
        let unique = self.store.load_unique();

        let mut inner = self.lock();
        let added = inner.restore(history, unique);
        if added > 0 {
            warn!("Unique UIDs snapshot lacked {} UIDs from history", added);
            if let Err(e) = self.store.save_unique(&inner.unique().to_vec()) {
                warn!("Failed to save unique UIDs: {}", e);
            }
        }
        info!(
            "Restored {} history entries and {} unique UIDs",
            inner.history().len(),
            inner.unique().len()
        );
        true
    }

    /// Record a presentation and persist whatever it changed.
    pub fn record(&self, identifier: CardIdentifier, now: DateTime<Utc>) -> Option<ScanEvent> {
        let mut inner = self.lock();

        let Some(event) = inner.observe(identifier, now) else {
            debug!("Debounced repeat presentation");
            return None;
        };

        if let Err(e) = self.store.save_history(&inner.history().to_vec()) {
            warn!("Failed to save history: {}", e);
        }
        if event.first_seen
            && let Err(e) = self.store.save_unique(&inner.unique().to_vec())
        {
            warn!("Failed to save unique UIDs: {}", e);
        }

        Some(event)
    }

    /// Empty the history and persist the empty document.
    ///
    /// The in-memory history is cleared even if the save fails.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the empty document could not be saved.
    pub fn clear_history(&self) -> StorageResult<()> {
        let mut inner = self.lock();
        inner.clear_history();
        self.store.save_history(&[]).inspect_err(|e| {
            warn!("Failed to save cleared history: {}", e);
        })
    }

    pub fn latest_identifier(&self) -> Option<CardIdentifier> {
        self.lock().latest().cloned()
    }

    pub fn history(&self) -> Vec<ScanRecord> {
        self.lock().history().to_vec()
    }

    pub fn tap_count(&self) -> u64 {
        self.lock().tap_count()
    }

    pub fn unique_identifiers(&self) -> Vec<CardIdentifier> {
        self.lock().unique().to_vec()
    }

    pub fn export_csv(&self) -> Result<String, ExportError> {
        self.lock().export_csv()
    }

    fn lock(&self) -> MutexGuard<'_, ScanLedger> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardtap_storage::MemoryStore;
    use chrono::TimeZone;
    use proptest::prelude::*;

    const WINDOW: Duration = Duration::from_secs(3);

    fn id(hex: &str) -> CardIdentifier {
        CardIdentifier::parse(hex).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn at_ms(ms: i64) -> DateTime<Utc> {
        t0() + TimeDelta::milliseconds(ms)
    }

    fn uids(ledger: &ScanLedger) -> Vec<&str> {
        ledger.history().iter().map(|r| r.uid.as_str()).collect()
    }

    #[test]
    fn test_repeat_inside_window_is_ignored() {
        let mut ledger = ScanLedger::new(10, WINDOW);

        assert!(ledger.observe(id("0A"), at_ms(0)).is_some());
        assert!(ledger.observe(id("0A"), at_ms(2_999)).is_none());

        assert_eq!(ledger.tap_count(), 1);
        assert_eq!(ledger.history().len(), 1);
    }

    #[test]
    fn test_repeat_at_window_boundary_is_accepted_without_new_tap() {
        let mut ledger = ScanLedger::new(10, WINDOW);
        ledger.observe(id("0A"), at_ms(0));

        let event = ledger.observe(id("0A"), at_ms(3_000)).unwrap();

        assert!(!event.new_tap);
        assert!(!event.first_seen);
        assert_eq!(ledger.tap_count(), 1);
        assert_eq!(uids(&ledger), vec!["0A", "0A"]);
    }

    #[test]
    fn test_ignored_repeat_does_not_extend_window() {
        let mut ledger = ScanLedger::new(10, WINDOW);
        ledger.observe(id("0A"), at_ms(0));
        assert!(ledger.observe(id("0A"), at_ms(2_000)).is_none());

        // Measured from the last accepted observation, not the ignored one.
        assert!(ledger.observe(id("0A"), at_ms(3_500)).is_some());
    }

    #[test]
    fn test_alternating_cards_within_window() {
        let mut ledger = ScanLedger::new(10, WINDOW);

        ledger.observe(id("0A"), at_ms(0));
        ledger.observe(id("0A"), at_ms(1_000));
        ledger.observe(id("0B"), at_ms(1_500));
        ledger.observe(id("0A"), at_ms(2_000));

        assert_eq!(ledger.tap_count(), 3);
        assert_eq!(uids(&ledger), vec!["0A", "0B", "0A"]);
        assert_eq!(ledger.unique().to_vec(), vec![id("0A"), id("0B")]);
        assert_eq!(ledger.latest(), Some(&id("0A")));
    }

    #[test]
    fn test_history_keeps_newest_ten() {
        let mut ledger = ScanLedger::new(10, WINDOW);
        for i in 0..11u8 {
            ledger.observe(CardIdentifier::from_bytes(&[i]).unwrap(), at_ms(i64::from(i)));
        }

        assert_eq!(ledger.history().len(), 10);
        assert_eq!(ledger.history().latest().unwrap().uid.as_str(), "0A");
        assert!(ledger.history().iter().all(|r| r.uid.as_str() != "00"));
        assert_eq!(ledger.unique().len(), 11);
    }

    #[test]
    fn test_clear_history_keeps_other_state() {
        let mut ledger = ScanLedger::new(10, WINDOW);
        ledger.observe(id("0A"), at_ms(0));
        ledger.observe(id("0B"), at_ms(10));

        ledger.clear_history();

        assert!(ledger.history().is_empty());
        assert_eq!(ledger.unique().len(), 2);
        assert_eq!(ledger.tap_count(), 2);
        assert_eq!(ledger.latest(), Some(&id("0B")));
    }

    #[test]
    fn test_restore_takes_latest_from_history_head() {
        let mut ledger = ScanLedger::new(3, WINDOW);
        let history = ["0C", "0B", "0A", "09"]
            .iter()
            .map(|uid| ScanRecord::new(id(uid), t0()))
            .collect();

        ledger.restore(history, vec![id("0A"), id("0B"), id("0C"), id("09")]);

        assert_eq!(uids(&ledger), vec!["0C", "0B", "0A"]);
        assert_eq!(ledger.latest(), Some(&id("0C")));
        assert_eq!(ledger.tap_count(), 0);

        // Restored latest suppresses a new tap for the same card.
        let event = ledger.observe(id("0C"), t0()).unwrap();
        assert!(!event.new_tap);
    }

    #[test]
    fn test_export_csv() {
        let mut ledger = ScanLedger::new(10, WINDOW);
        assert_eq!(ledger.export_csv(), Err(ExportError::NothingToExport));

        ledger.observe(id("DEADBEEF"), at_ms(0));
        ledger.observe(id("04ABCDEF"), at_ms(10));

        assert_eq!(ledger.export_csv().unwrap(), "UID\n04ABCDEF\nDEADBEEF\n");
    }

    #[test]
    fn test_ledger_persists_changes() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone(), 10, WINDOW);

        ledger.record(id("0A"), at_ms(0));
        ledger.record(id("0A"), at_ms(100));
        ledger.record(id("0A"), at_ms(5_000));

        // Two accepted scans save history twice, the unique set once.
        assert_eq!(store.save_count(), 3);
        assert_eq!(store.load_history().len(), 2);
        assert_eq!(store.load_unique(), vec![id("0A")]);
    }

    #[test]
    fn test_ledger_survives_save_failures() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone(), 10, WINDOW);
        store.set_fail_saves(true);

        let event = ledger.record(id("0A"), at_ms(0)).unwrap();
        assert_eq!(event.tap_count, 1);
        assert_eq!(ledger.history().len(), 1);
        assert_eq!(ledger.unique_identifiers(), vec![id("0A")]);
        assert!(store.load_history().is_empty());

        assert!(ledger.clear_history().is_err());
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn test_restore_happens_once() {
        let store = Arc::new(MemoryStore::new());
        store.save_history(&[ScanRecord::new(id("0A"), t0())]).unwrap();
        store.save_unique(&[id("0A")]).unwrap();
        let ledger = Ledger::new(store.clone(), 10, WINDOW);

        assert!(ledger.restore_once());
        ledger.record(id("0B"), at_ms(0));
        store.save_history(&[]).unwrap();

        assert!(!ledger.restore_once());
        assert_eq!(ledger.history().len(), 2);
        assert_eq!(ledger.latest_identifier(), Some(id("0B")));
    }

    #[test]
    fn test_restore_adds_history_ids_missing_from_unique_set() {
        let mut ledger = ScanLedger::new(10, WINDOW);
        let history = vec![
            ScanRecord::new(id("0B"), at_ms(1_000)),
            ScanRecord::new(id("0A"), at_ms(0)),
        ];

        let added = ledger.restore(history, vec![id("0A"), id("0C")]);

        assert_eq!(added, 1);
        assert_eq!(ledger.latest(), Some(&id("0B")));
        assert_eq!(ledger.unique().to_vec(), vec![id("0A"), id("0B"), id("0C")]);
    }

    #[test]
    fn test_restore_with_corrupt_unique_document() {
        let store = Arc::new(MemoryStore::new());
        store.save_history(&[ScanRecord::new(id("0A"), t0())]).unwrap();
        store.put_raw(cardtap_storage::Snapshot::UniqueIdentifiers, "{corrupt");
        let ledger = Ledger::new(store.clone(), 10, WINDOW);

        assert!(ledger.restore_once());

        assert_eq!(ledger.latest_identifier(), Some(id("0A")));
        assert_eq!(ledger.unique_identifiers(), vec![id("0A")]);
        assert_eq!(ledger.export_csv().unwrap(), "UID\n0A\n");
        // The repaired set replaces the unreadable document.
        assert_eq!(store.load_unique(), vec![id("0A")]);
    }

    #[test]
    fn test_clear_history_persists_empty_document() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone(), 10, WINDOW);
        ledger.record(id("0A"), at_ms(0));

        ledger.clear_history().unwrap();

        assert_eq!(store.raw(cardtap_storage::Snapshot::History).as_deref(), Some("[]"));
        assert_eq!(ledger.tap_count(), 1);
        assert_eq!(ledger.latest_identifier(), Some(id("0A")));
    }

    proptest! {
        #[test]
        fn prop_ledger_invariants(
            scans in prop::collection::vec((0u8..4, 0i64..5_000), 0..60),
        ) {
            let mut ledger = ScanLedger::new(10, WINDOW);
            let mut now = t0();
            let mut accepted = 0u64;

            for (card, gap_ms) in scans {
                now += TimeDelta::milliseconds(gap_ms);
                let card = CardIdentifier::from_bytes(&[card]).unwrap();
                if let Some(event) = ledger.observe(card.clone(), now) {
                    accepted += 1;
                    prop_assert_eq!(&event.record.uid, &card);
                    prop_assert_eq!(event.tap_count, ledger.tap_count());
                }

                prop_assert!(ledger.history().len() <= 10);
                prop_assert!(ledger.tap_count() <= accepted);
                prop_assert_eq!(
                    ledger.history().latest().map(|r| &r.uid),
                    ledger.latest()
                );
                for record in ledger.history().iter() {
                    prop_assert!(ledger.unique().contains(&record.uid));
                }
            }

            prop_assert_eq!(ledger.history().len() as u64, accepted.min(10));
        }
    }
}
