//! JSON file implementation of [`SnapshotStore`].
//!
//! Each collection lives in its own pretty-printed JSON file inside a data
//! directory. Writes go to a temporary file in the same directory which is
//! then renamed over the target, so a crash mid-write never leaves a
//! truncated document behind.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use cardtap_core::constants::{HISTORY_FILE_NAME, UNIQUE_IDS_FILE_NAME};
use cardtap_core::{CardIdentifier, ScanRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::trace;

use crate::error::{StorageError, StorageResult};
use crate::snapshot::SnapshotStore;

/// Snapshot store backed by `history.json` and `unique_uids.json`.
///
/// # Examples
///
/// ```no_run
/// use cardtap_storage::{JsonFileStore, SnapshotStore};
///
/// let store = JsonFileStore::new("./data");
/// let history = store.load_history();
/// println!("{} records", history.len());
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    history_path: PathBuf,
    unique_path: PathBuf,
}

impl JsonFileStore {
    /// Store snapshots under `dir` with the default file names.
    ///
    /// The directory is created on the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            history_path: dir.join(HISTORY_FILE_NAME),
            unique_path: dir.join(UNIQUE_IDS_FILE_NAME),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn unique_path(&self) -> &Path {
        &self.unique_path
    }

    fn write_document<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> StorageResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;

        let json = serde_json::to_string_pretty(value)?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.flush())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| StorageError::io(path, e.error))?;

        trace!("Wrote {} bytes to {}", json.len(), path.display());
        Ok(())
    }

    fn read_document<T: DeserializeOwned>(&self, path: &Path) -> StorageResult<Option<T>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(path, e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Malformed {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl SnapshotStore for JsonFileStore {
    fn save_history(&self, records: &[ScanRecord]) -> StorageResult<()> {
        self.write_document(&self.history_path, records)
    }

    fn save_unique(&self, ids: &[CardIdentifier]) -> StorageResult<()> {
        self.write_document(&self.unique_path, ids)
    }

    fn try_load_history(&self) -> StorageResult<Option<Vec<ScanRecord>>> {
        self.read_document(&self.history_path)
    }

    fn try_load_unique(&self) -> StorageResult<Option<Vec<CardIdentifier>>> {
        self.read_document(&self.unique_path)
    }
}
