//! Reader capability trait.
//!
//! [`CardReader`] is the contract between the session and a physical (or
//! simulated) contactless reader with a two-line LCD. The transport behind
//! it (USB, PC/SC, serial) is entirely the implementor's business.
//!
//! Methods take `&self` so that display commands coming from the command
//! surface can reach the device while the scan loop is suspended inside
//! [`CardReader::read_uid`]. Implementations use interior mutability.
//!
//! Futures are declared `Send` so the session can be driven from a spawned
//! Tokio task while staying generic over the reader type. Implementors may
//! still write the methods as plain `async fn`.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::{ControlCommand, DisplayText};

/// Contactless reader with display, backlight and control channel.
///
/// # Object Safety and Dynamic Dispatch
///
/// This trait is NOT object-safe because its methods return `impl Future`.
/// Use generic type parameters, or [`AnyCardReader`](crate::devices::AnyCardReader)
/// where a single concrete type is needed.
///
/// # Examples
///
/// ```no_run
/// use cardtap_hardware::traits::CardReader;
/// use cardtap_hardware::error::Result;
/// use tokio_util::sync::CancellationToken;
///
/// async fn read_one<R: CardReader>(reader: &R) -> Result<Vec<u8>> {
///     reader.initialize().await?;
///     let uid = reader.read_uid(&CancellationToken::new()).await?;
///     reader.beep().await.ok();
///     reader.stop_read().await?;
///     Ok(uid)
/// }
/// ```
pub trait CardReader: Send + Sync {
    /// Bring the device online.
    ///
    /// May be called again after a transport failure to start over.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened or configured.
    fn initialize(&self) -> impl Future<Output = Result<()>> + Send;

    /// Liveness check: whether the device currently exposes a working read
    /// capability. Called after initialization has settled.
    fn is_ready(&self) -> bool;

    /// Human-readable name of the attached reader, if known.
    fn reader_name(&self) -> Option<String>;

    /// Wait for a card and return its raw UID bytes.
    ///
    /// Blocks asynchronously with no timeout until a card is presented or
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// - [`HardwareError::Cancelled`](crate::HardwareError::Cancelled) when
    ///   `cancel` fires
    /// - a transport-fatal error if the link went down while waiting
    /// - a transient error if the card could not be read
    fn read_uid(&self, cancel: &CancellationToken)
    -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Reset the device's read state after a card was handled.
    fn stop_read(&self) -> impl Future<Output = Result<()>> + Send;

    /// Write two lines to the display.
    fn write_display(&self, line1: &str, line2: &str)
    -> impl Future<Output = Result<()>> + Send;

    /// Blank the display.
    fn clear_display(&self) -> impl Future<Output = Result<()>> + Send;

    /// Switch the display backlight.
    fn set_backlight(&self, on: bool) -> impl Future<Output = Result<()>> + Send;

    /// Send a raw control sequence and return the device's response bytes.
    fn transmit_control(&self, command: &[u8]) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Write a [`DisplayText`].
    fn show(&self, text: &DisplayText) -> impl Future<Output = Result<()>> + Send {
        self.write_display(&text.line1, &text.line2)
    }

    /// Trigger the audible beep.
    fn beep(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            let command = ControlCommand::beep();
            self.transmit_control(command.as_bytes()).await?;
            Ok(())
        }
    }

    /// Clear the display and show the idle prompt.
    fn show_idle_prompt(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.clear_display().await?;
            self.show(&DisplayText::idle()).await
        }
    }
}
