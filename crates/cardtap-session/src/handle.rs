//! Query and command surface of a running session.
//!
//! A [`SessionHandle`] is what an outer layer (an HTTP facade, the CLI)
//! talks to. Queries return snapshots; nothing returned aliases the
//! session's internal state.

use std::sync::Arc;

use cardtap_core::constants::NO_SCAN_SENTINEL;
use cardtap_core::{CardIdentifier, ScanRecord};
use cardtap_hardware::CardReader;
use cardtap_storage::StorageResult;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::ExportError;
use crate::state::{ConnectionStatus, StateTransition};
use crate::supervisor::Shared;

/// Every identifier ever seen, with its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueIdentifiers {
    pub count: usize,
    pub list: Vec<CardIdentifier>,
}

/// Cheaply cloneable handle to a [`Session`](crate::Session).
pub struct SessionHandle<R> {
    shared: Arc<Shared<R>>,
}

impl<R> Clone for SessionHandle<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: CardReader> SessionHandle<R> {
    pub(crate) fn new(shared: Arc<Shared<R>>) -> Self {
        Self { shared }
    }

    /// The most recently accepted identifier, or `"Waiting for scan..."`.
    pub fn latest_identifier(&self) -> String {
        self.shared
            .ledger
            .latest_identifier()
            .map_or_else(|| NO_SCAN_SENTINEL.to_string(), String::from)
    }

    /// Recent scans, newest first.
    pub fn history(&self) -> Vec<ScanRecord> {
        self.shared.ledger.history()
    }

    /// Identifier changes since the process started.
    pub fn tap_count(&self) -> u64 {
        self.shared.ledger.tap_count()
    }

    pub fn unique_identifiers(&self) -> UniqueIdentifiers {
        let list = self.shared.ledger.unique_identifiers();
        UniqueIdentifiers {
            count: list.len(),
            list,
        }
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    /// Receive every published status change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.subscribe()
    }

    /// The last `count` lifecycle transitions, oldest first.
    ///
    /// At most the 100 most recent transitions are retained.
    pub fn recent_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.shared.recent_transitions(count)
    }

    /// Empty the history and persist the empty document.
    ///
    /// # Errors
    ///
    /// Returns the store's error if saving failed; the in-memory history
    /// is cleared regardless.
    pub fn clear_history(&self) -> StorageResult<()> {
        info!("Clearing scan history");
        self.shared.ledger.clear_history()
    }

    /// Put the idle prompt back on the display.
    pub async fn reset_display(&self) {
        if let Err(e) = self.shared.reader.show_idle_prompt().await {
            warn!("Failed to reset display: {}", e);
        }
    }

    /// The unique identifiers as CSV with a `UID` header.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::NothingToExport` if no identifier was ever seen.
    pub fn export_csv(&self) -> Result<String, ExportError> {
        self.shared.ledger.export_csv()
    }

    /// Abort the current scan loop and run a fresh initialization cycle.
    ///
    /// Returns `false` if no scan loop was running.
    pub fn request_reconnect(&self) -> bool {
        let requested = self.shared.request_reconnect();
        if requested {
            info!("Reconnect requested");
        }
        requested
    }

    /// Stop the session; `run` returns once the current wait is aborted.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shared.shutdown();
    }
}
