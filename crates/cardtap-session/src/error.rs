//! Error types for the reader session.

use cardtap_hardware::{FailureKind, HardwareError};
use thiserror::Error;

/// Errors that end or refuse a supervisor run.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Every initialization attempt of one cycle failed
    #[error("Reader initialization failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// `run` was called while another run of the same session is active
    #[error("Session is already running")]
    AlreadyRunning,

    /// Invalid configuration or an illegal state transition
    #[error(transparent)]
    Core(#[from] cardtap_core::Error),
}

/// Errors raised by one scan pipeline iteration.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The reader failed or the read was cancelled
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// The reader returned bytes that do not form an identifier
    #[error("Unusable card identifier: {0}")]
    InvalidIdentifier(#[source] cardtap_core::Error),
}

impl ScanError {
    /// How the scan loop should react to this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Hardware(e) => e.kind(),
            Self::InvalidIdentifier(_) => FailureKind::Transient,
        }
    }
}

/// Errors from exporting the unique-identifier set.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportError {
    /// No identifier has ever been recorded
    #[error("No UIDs to export")]
    NothingToExport,
}
