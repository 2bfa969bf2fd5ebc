//! Reader capability layer for the cardtap session.
//!
//! This crate defines the contract the session uses to drive a contactless
//! card reader with a two-line display, plus a mock implementation for
//! development and testing.
//!
//! # Design
//!
//! - **Async-first**: every device call is asynchronous; trait methods
//!   return `Send` futures so the session can run on a spawned Tokio task.
//! - **Shared access**: methods take `&self`, letting display commands run
//!   while a read is pending.
//! - **Cancellable reads**: [`CardReader::read_uid`] takes a
//!   `CancellationToken`, so a reconnect or shutdown aborts a pending read
//!   deterministically.
//! - **Structured failures**: every [`HardwareError`] maps to a
//!   [`FailureKind`] that tells the session whether the link is gone.
//!
//! # Examples
//!
//! ```no_run
//! use cardtap_hardware::{CardReader, HardwareError, Result};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn scan_once<R: CardReader>(reader: &R) -> Result<Vec<u8>> {
//!     match reader.read_uid(&CancellationToken::new()).await {
//!         Ok(uid) => {
//!             reader.beep().await.ok();
//!             Ok(uid)
//!         }
//!         Err(e) if e.is_transport_fatal() => Err(HardwareError::ReaderNotConnected),
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnyCardReader;
pub use error::{FailureKind, HardwareError, Result};
pub use traits::CardReader;
pub use types::{BEEP_COMMAND, ControlCommand, DisplayText};
