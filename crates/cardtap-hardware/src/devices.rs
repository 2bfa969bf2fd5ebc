//! Enum wrapper for reader dispatch.
//!
//! [`CardReader`] returns `impl Future` and so cannot be boxed as a trait
//! object. Code that needs one concrete reader type chosen at runtime (the
//! binary, for instance) uses [`AnyCardReader`] instead, which forwards each
//! call to the wrapped implementation.
//!
//! # Examples
//!
//! ```
//! use cardtap_hardware::devices::AnyCardReader;
//! use cardtap_hardware::mock::MockReader;
//!
//! let (reader, _handle) = MockReader::new();
//! let any_reader = AnyCardReader::Mock(reader);
//! ```

use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::mock::MockReader;
use crate::traits::CardReader;

/// Enum wrapper for reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCardReader {
    /// Simulated reader for development and testing.
    Mock(MockReader),
}

impl CardReader for AnyCardReader {
    async fn initialize(&self) -> Result<()> {
        match self {
            Self::Mock(device) => device.initialize().await,
        }
    }

    fn is_ready(&self) -> bool {
        match self {
            Self::Mock(device) => device.is_ready(),
        }
    }

    fn reader_name(&self) -> Option<String> {
        match self {
            Self::Mock(device) => device.reader_name(),
        }
    }

    async fn read_uid(&self, cancel: &CancellationToken) -> Result<Vec<u8>> {
        match self {
            Self::Mock(device) => device.read_uid(cancel).await,
        }
    }

    async fn stop_read(&self) -> Result<()> {
        match self {
            Self::Mock(device) => device.stop_read().await,
        }
    }

    async fn write_display(&self, line1: &str, line2: &str) -> Result<()> {
        match self {
            Self::Mock(device) => device.write_display(line1, line2).await,
        }
    }

    async fn clear_display(&self) -> Result<()> {
        match self {
            Self::Mock(device) => device.clear_display().await,
        }
    }

    async fn set_backlight(&self, on: bool) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_backlight(on).await,
        }
    }

    async fn transmit_control(&self, command: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Mock(device) => device.transmit_control(command).await,
        }
    }
}
