//! Core domain types for the cardtap reader session.
//!
//! Everything here is free of I/O: identifiers, scan records, the bounded
//! scan history and the unique-identifier set, plus the shared constants
//! and error type used by the other workspace crates.

pub mod constants;
pub mod error;
pub mod history;
pub mod types;

pub use error::{Error, Result};
pub use history::{History, UniqueIdentifierSet};
pub use types::{CardIdentifier, ScanRecord};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
