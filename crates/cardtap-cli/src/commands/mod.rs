pub mod clear_history;
pub mod export;
pub mod history;
pub mod run;
pub mod unique;

use std::path::Path;
use std::sync::Arc;

use cardtap_session::{Ledger, SessionConfig};
use cardtap_storage::JsonFileStore;

/// Ledger over the snapshots in `data_dir`, for commands that need no reader.
fn open_ledger(data_dir: &Path) -> Ledger {
    let config = SessionConfig::default();
    let ledger = Ledger::new(
        Arc::new(JsonFileStore::new(data_dir)),
        config.history_capacity,
        config.debounce_window,
    );
    ledger.restore_once();
    ledger
}
