//! Snapshot persistence for the cardtap reader session.
//!
//! The session keeps two small collections on disk between runs: the
//! recent scan history and the set of every identifier ever seen. This
//! crate defines the [`SnapshotStore`] contract for them and provides:
//!
//! - [`JsonFileStore`] - one human-readable JSON file per collection,
//!   written atomically
//! - [`MemoryStore`] - in-process store for tests, with save-failure
//!   injection
//!
//! # Document Formats
//!
//! `history.json`, newest first, at most ten entries:
//!
//! ```json
//! [
//!   { "uid": "04ABCDEF", "timestamp": "2025-01-15T12:30:00Z" }
//! ]
//! ```
//!
//! `unique_uids.json`, unordered:
//!
//! ```json
//! ["04ABCDEF", "DEADBEEF"]
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use cardtap_storage::{JsonFileStore, SnapshotStore};
//! use cardtap_core::{CardIdentifier, ScanRecord};
//! use chrono::Utc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonFileStore::new("./data");
//!
//! let id = CardIdentifier::parse("04ABCDEF")?;
//! store.save_history(&[ScanRecord::new(id.clone(), Utc::now())])?;
//! store.save_unique(&[id])?;
//!
//! assert_eq!(store.load_history().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod json_file;
pub mod memory;
pub mod snapshot;

pub use error::{StorageError, StorageResult};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use snapshot::{Snapshot, SnapshotStore};
