//! In-memory implementation of [`SnapshotStore`].
//!
//! Documents are kept as serialized JSON strings so that loads exercise the
//! same encoding as the file store. Saves can be made to fail on demand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use cardtap_core::{CardIdentifier, ScanRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StorageError, StorageResult};
use crate::snapshot::{Snapshot, SnapshotStore};

/// Snapshot store that never touches the filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    history: Mutex<Option<String>>,
    unique: Mutex<Option<String>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves across both collections.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Replace a stored document with raw text, bypassing serialization.
    pub fn put_raw(&self, snapshot: Snapshot, document: impl Into<String>) {
        *self.slot(snapshot) = Some(document.into());
    }

    /// The stored document text, if any.
    pub fn raw(&self, snapshot: Snapshot) -> Option<String> {
        self.slot(snapshot).clone()
    }

    fn slot(&self, snapshot: Snapshot) -> MutexGuard<'_, Option<String>> {
        let slot = match snapshot {
            Snapshot::History => &self.history,
            Snapshot::UniqueIdentifiers => &self.unique,
        };
        slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn save<T: Serialize + ?Sized>(&self, snapshot: Snapshot, value: &T) -> StorageResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!(
                "saving {snapshot} is disabled"
            )));
        }

        let document = serde_json::to_string(value)?;
        *self.slot(snapshot) = Some(document);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, snapshot: Snapshot) -> StorageResult<Option<T>> {
        match self.slot(snapshot).as_deref() {
            Some(document) => Ok(Some(serde_json::from_str(document)?)),
            None => Ok(None),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn save_history(&self, records: &[ScanRecord]) -> StorageResult<()> {
        self.save(Snapshot::History, records)
    }

    fn save_unique(&self, ids: &[CardIdentifier]) -> StorageResult<()> {
        self.save(Snapshot::UniqueIdentifiers, ids)
    }

    fn try_load_history(&self) -> StorageResult<Option<Vec<ScanRecord>>> {
        self.load(Snapshot::History)
    }

    fn try_load_unique(&self) -> StorageResult<Option<Vec<CardIdentifier>>> {
        self.load(Snapshot::UniqueIdentifiers)
    }
}
