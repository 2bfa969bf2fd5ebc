use crate::{Result, error::Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card unique identifier, normalized to upper-case hexadecimal text.
///
/// Two presentations of the same physical card always produce equal
/// identifiers regardless of how the reader or a persisted document spelled
/// the hex digits.
///
/// # Examples
///
/// ```
/// use cardtap_core::CardIdentifier;
///
/// let id = CardIdentifier::from_bytes(&[0x04, 0xab, 0xcd, 0xef]).unwrap();
/// assert_eq!(id.as_str(), "04ABCDEF");
///
/// let parsed: CardIdentifier = "04abcdef".parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardIdentifier(String);

impl CardIdentifier {
    /// Build an identifier from the raw UID bytes reported by a reader.
    ///
    /// # Errors
    /// Returns `Error::InvalidIdentifier` if `bytes` is empty.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidIdentifier(
                "UID must contain at least one byte".to_string(),
            ));
        }

        let hex = bytes.iter().map(|b| format!("{b:02X}")).collect();
        Ok(CardIdentifier(hex))
    }

    /// Parse an identifier from hex text, normalizing case and whitespace.
    ///
    /// # Errors
    /// Returns `Error::InvalidIdentifier` if the text is empty, has an odd
    /// number of digits, or contains non-hex characters.
    pub fn parse(text: &str) -> Result<Self> {
        let hex = text.trim().to_ascii_uppercase();

        if hex.is_empty() {
            return Err(Error::InvalidIdentifier("UID cannot be empty".to_string()));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidIdentifier(format!(
                "UID must be hexadecimal, got {text:?}"
            )));
        }
        if hex.len() % 2 != 0 {
            return Err(Error::InvalidIdentifier(format!(
                "UID must have an even number of hex digits, got {}",
                hex.len()
            )));
        }

        Ok(CardIdentifier(hex))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of UID bytes this identifier encodes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }

    /// Decode back into the raw UID bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        // Validated on construction: even length, ASCII hex only.
        self.0
            .as_bytes()
            .chunks(2)
            .filter_map(|pair| std::str::from_utf8(pair).ok())
            .filter_map(|pair| u8::from_str_radix(pair, 16).ok())
            .collect()
    }
}

impl fmt::Display for CardIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CardIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardIdentifier::parse(s)
    }
}

impl TryFrom<String> for CardIdentifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CardIdentifier::parse(&value)
    }
}

impl From<CardIdentifier> for String {
    fn from(id: CardIdentifier) -> Self {
        id.0
    }
}

/// One accepted card presentation.
///
/// Serialized as `{"uid": "04ABCDEF", "timestamp": "2025-01-15T12:30:00Z"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Identifier of the accepted card.
    pub uid: CardIdentifier,

    /// When the scan was accepted (ISO-8601 on disk).
    pub timestamp: DateTime<Utc>,
}

impl ScanRecord {
    /// Create a record for `uid` observed at `timestamp`.
    pub fn new(uid: CardIdentifier, timestamp: DateTime<Utc>) -> Self {
        Self { uid, timestamp }
    }
}
