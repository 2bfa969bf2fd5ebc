//! Feedback primitives shared by reader implementations.
//!
//! The session only ever sends a handful of fixed commands and two-line
//! display texts; everything else about the device is the driver's concern.

use cardtap_core::CardIdentifier;
use serde::{Deserialize, Serialize};

/// Escape command that makes the reader beep once.
pub const BEEP_COMMAND: [u8; 5] = [0xFF, 0x00, 0x52, 0x00, 0x00];

/// Raw control sequence sent to the reader outside the card channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCommand(Vec<u8>);

impl ControlCommand {
    /// Wrap arbitrary control bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The audible beep used as scan feedback.
    pub fn beep() -> Self {
        Self(BEEP_COMMAND.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Two lines of text for the reader's LCD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayText {
    /// First (top) line.
    pub line1: String,

    /// Second (bottom) line.
    pub line2: String,
}

impl DisplayText {
    /// Create display text from two lines.
    pub fn new(line1: impl Into<String>, line2: impl Into<String>) -> Self {
        Self {
            line1: line1.into(),
            line2: line2.into(),
        }
    }

    /// Prompt shown while the reader waits for a card.
    pub fn idle() -> Self {
        Self::new("Waiting for", "card...")
    }

    /// Text shown while an accepted identifier dwells on the display.
    pub fn card(uid: &CardIdentifier) -> Self {
        Self::new("Card UID:", uid.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beep_command_bytes() {
        assert_eq!(
            ControlCommand::beep().as_bytes(),
            &[0xFF, 0x00, 0x52, 0x00, 0x00]
        );
    }

    #[test]
    fn test_idle_prompt() {
        let idle = DisplayText::idle();
        assert_eq!(idle.line1, "Waiting for");
        assert_eq!(idle.line2, "card...");
    }

    #[test]
    fn test_card_text() {
        let uid = CardIdentifier::parse("04ABCDEF").unwrap();
        assert_eq!(DisplayText::card(&uid), DisplayText::new("Card UID:", "04ABCDEF"));
    }
}
