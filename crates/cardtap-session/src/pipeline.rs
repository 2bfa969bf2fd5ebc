//! The scan loop.
//!
//! One iteration waits for a card, turns the raw UID into an identifier,
//! records it in the [`Ledger`] and gives the operator feedback (beep and
//! the identifier on the display for a short dwell before the idle prompt
//! returns). Errors are sorted by [`FailureKind`]: cancellation ends the
//! loop, transport failures hand control back to the supervisor, anything
//! else is absorbed in place.

use std::sync::Arc;
use std::time::Duration;

use cardtap_core::CardIdentifier;
use cardtap_hardware::{CardReader, DisplayText, FailureKind, HardwareError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::ScanError;
use crate::ledger::Ledger;
use crate::observer::{ScanEvent, ScanObserver};
use crate::state::ConnectionStatus;

/// Result of one successful iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    /// A scan was recorded.
    Accepted(ScanEvent),

    /// A repeat presentation inside the debounce window was ignored.
    Debounced,

    /// The read completed for an initialization cycle that is already over.
    Stale,
}

/// Why the scan loop stopped.
#[derive(Debug)]
pub enum LoopExit {
    /// The loop token fired (shutdown or reconnect request).
    Cancelled,

    /// The reader failed in a way only a new initialization can fix.
    TransportLost(ScanError),
}

/// Sleep for `duration` unless `cancel` fires first.
pub(crate) async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<(), HardwareError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(HardwareError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Scan event pipeline bound to one reader and ledger.
pub struct ScanPipeline<R> {
    reader: Arc<R>,
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
    observers: Arc<[Arc<dyn ScanObserver>]>,
    status: watch::Receiver<ConnectionStatus>,
    debounce_pause: Duration,
    display_dwell: Duration,
    error_pause: Duration,
}

impl<R: CardReader> ScanPipeline<R> {
    pub fn new(
        reader: Arc<R>,
        ledger: Arc<Ledger>,
        clock: Arc<dyn Clock>,
        observers: Arc<[Arc<dyn ScanObserver>]>,
        status: watch::Receiver<ConnectionStatus>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            reader,
            ledger,
            clock,
            observers,
            status,
            debounce_pause: config.debounce_pause,
            display_dwell: config.display_dwell,
            error_pause: config.error_pause,
        }
    }

    /// Run iterations until cancelled or the reader is lost.
    ///
    /// `epoch` is the initialization cycle this loop belongs to.
    pub async fn run(&self, epoch: u64, cancel: &CancellationToken) -> LoopExit {
        debug!("Scan loop started for epoch {}", epoch);

        loop {
            let error = match self.run_iteration(epoch, cancel).await {
                Ok(_) => continue,
                Err(e) => e,
            };

            match error.kind() {
                FailureKind::Cancelled => {
                    debug!("Scan loop for epoch {} cancelled", epoch);
                    return LoopExit::Cancelled;
                }
                FailureKind::TransportFatal => {
                    warn!("Reader lost: {}", error);
                    return LoopExit::TransportLost(error);
                }
                FailureKind::Transient => {
                    warn!("Scan failed, continuing: {}", error);
                    if pause(self.error_pause, cancel).await.is_err() {
                        return LoopExit::Cancelled;
                    }
                    if let Err(e) = self.reader.show_idle_prompt().await {
                        warn!("Failed to reset display after scan error: {}", e);
                    }
                }
            }
        }
    }

    /// Wait for one card and process it.
    ///
    /// # Errors
    ///
    /// Returns the reader's error, `Cancelled` if `cancel` fired during a
    /// wait, or `InvalidIdentifier` if the reader returned no UID bytes.
    pub async fn run_iteration(
        &self,
        epoch: u64,
        cancel: &CancellationToken,
    ) -> Result<Iteration, ScanError> {
        let bytes = self.reader.read_uid(cancel).await?;

        if cancel.is_cancelled() {
            return Err(HardwareError::Cancelled.into());
        }
        if self.status.borrow().epoch != epoch {
            debug!("Discarding read from stale epoch {}", epoch);
            return Ok(Iteration::Stale);
        }

        let identifier = CardIdentifier::from_bytes(&bytes).map_err(ScanError::InvalidIdentifier)?;

        let Some(event) = self.ledger.record(identifier, self.clock.now()) else {
            pause(self.debounce_pause, cancel).await?;
            return Ok(Iteration::Debounced);
        };

        info!(
            "Card scanned: {} (taps: {}{})",
            event.record.uid,
            event.tap_count,
            if event.first_seen { ", new" } else { "" }
        );

        for observer in self.observers.iter() {
            observer.on_scan(&event);
        }

        if let Err(e) = self.reader.beep().await {
            warn!("Beep failed: {}", e);
        }
        if let Err(e) = self.reader.show(&DisplayText::card(&event.record.uid)).await {
            warn!("Failed to show UID on display: {}", e);
        }

        pause(self.display_dwell, cancel).await?;
        self.reader.show_idle_prompt().await?;
        self.reader.stop_read().await?;

        Ok(Iteration::Accepted(event))
    }
}
