//! The snapshot store contract.
//!
//! Two collections are persisted independently, each as one whole
//! document: the scan history (newest first) and the unique-identifier set.
//! Saves overwrite the full document; loads read and parse the full
//! document.

use std::fmt;

use cardtap_core::{CardIdentifier, ScanRecord};
use tracing::{debug, warn};

use crate::error::StorageResult;

/// Which persisted collection an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Snapshot {
    History,
    UniqueIdentifiers,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::History => write!(f, "history"),
            Self::UniqueIdentifiers => write!(f, "unique identifiers"),
        }
    }
}

/// Durable store for the two snapshot collections.
///
/// Operations are synchronous: a caller that saves does not continue until
/// the document is on disk or the write has failed.
///
/// # Blocking
///
/// Saves run inline on the calling thread, which may be a Tokio worker.
/// The session calls them while holding its ledger mutex, so a save is
/// ordered with the scan or clear that produced it. Implementations must
/// not await, must not call back into the session, and should keep each
/// write to a single small document. File-backed stores therefore block
/// the worker for the duration of one `fsync`.
///
/// # Implementation Note
///
/// Implementors provide the fallible `try_*` loads; the provided
/// [`load_history`](Self::load_history) and
/// [`load_unique`](Self::load_unique) never fail, degrading absent or
/// malformed documents to empty collections.
pub trait SnapshotStore: Send + Sync {
    /// Overwrite the history document.
    fn save_history(&self, records: &[ScanRecord]) -> StorageResult<()>;

    /// Overwrite the unique-identifier document.
    fn save_unique(&self, ids: &[CardIdentifier]) -> StorageResult<()>;

    /// Read the history document; `Ok(None)` when it does not exist.
    fn try_load_history(&self) -> StorageResult<Option<Vec<ScanRecord>>>;

    /// Read the unique-identifier document; `Ok(None)` when it does not exist.
    fn try_load_unique(&self) -> StorageResult<Option<Vec<CardIdentifier>>>;

    /// Read the history, treating absence and corruption as empty.
    fn load_history(&self) -> Vec<ScanRecord> {
        recover(Snapshot::History, self.try_load_history())
    }

    /// Read the unique identifiers, treating absence and corruption as empty.
    fn load_unique(&self) -> Vec<CardIdentifier> {
        recover(Snapshot::UniqueIdentifiers, self.try_load_unique())
    }
}

fn recover<T>(snapshot: Snapshot, loaded: StorageResult<Option<Vec<T>>>) -> Vec<T> {
    match loaded {
        Ok(Some(items)) => {
            debug!("Loaded {} {} entries", items.len(), snapshot);
            items
        }
        Ok(None) => {
            debug!("No stored {} snapshot, starting empty", snapshot);
            Vec::new()
        }
        Err(e) => {
            warn!("Failed to load {} snapshot, starting empty: {}", snapshot, e);
            Vec::new()
        }
    }
}
