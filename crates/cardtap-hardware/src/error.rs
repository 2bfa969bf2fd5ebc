//! Error types for reader operations.
//!
//! Every failure a driver reports carries a [`FailureKind`]. The session
//! decides between reconnecting and retrying in place from that kind alone,
//! so drivers must pick the variant that matches what actually happened on
//! the link. There is no catch-all variant.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// How the session should react to a failed driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The device link is gone; the session must reinitialize from scratch.
    TransportFatal,

    /// The call failed but the link is believed healthy.
    Transient,

    /// The call was aborted through its cancellation token.
    Cancelled,
}

/// Errors that can occur during reader operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// A USB/PC-SC control transfer was rejected by the device.
    #[error("Control transfer failed: {message}")]
    ControlTransferFailed { message: String },

    /// The handle used to talk to the device is no longer valid.
    #[error("Invalid device handle: {message}")]
    InvalidHandle { message: String },

    /// No reader is attached to the host.
    #[error("Reader not connected")]
    ReaderNotConnected,

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Card reading error.
    #[error("Card read error: {message}")]
    CardReadError { message: String },

    /// Display or backlight command failed.
    #[error("Display error: {message}")]
    DisplayError { message: String },

    /// Operation aborted by its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,
}

impl HardwareError {
    /// Classify this error for the session's recovery policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardtap_hardware::{FailureKind, HardwareError};
    ///
    /// assert_eq!(
    ///     HardwareError::disconnected("ACR1222L").kind(),
    ///     FailureKind::TransportFatal
    /// );
    /// assert_eq!(HardwareError::card_read("CRC").kind(), FailureKind::Transient);
    /// ```
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Disconnected { .. }
            | Self::ControlTransferFailed { .. }
            | Self::InvalidHandle { .. }
            | Self::ReaderNotConnected => FailureKind::TransportFatal,
            Self::Cancelled => FailureKind::Cancelled,
            Self::CommunicationError { .. }
            | Self::InitializationFailed { .. }
            | Self::CardReadError { .. }
            | Self::DisplayError { .. } => FailureKind::Transient,
        }
    }

    /// Shorthand for `kind() == FailureKind::TransportFatal`.
    pub fn is_transport_fatal(&self) -> bool {
        self.kind() == FailureKind::TransportFatal
    }

    /// Shorthand for `kind() == FailureKind::Cancelled`.
    pub fn is_cancelled(&self) -> bool {
        self.kind() == FailureKind::Cancelled
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new control transfer error.
    pub fn control_transfer(message: impl Into<String>) -> Self {
        Self::ControlTransferFailed {
            message: message.into(),
        }
    }

    /// Create a new invalid handle error.
    pub fn invalid_handle(message: impl Into<String>) -> Self {
        Self::InvalidHandle {
            message: message.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new card read error.
    pub fn card_read(message: impl Into<String>) -> Self {
        Self::CardReadError {
            message: message.into(),
        }
    }

    /// Create a new display error.
    pub fn display(message: impl Into<String>) -> Self {
        Self::DisplayError {
            message: message.into(),
        }
    }
}
