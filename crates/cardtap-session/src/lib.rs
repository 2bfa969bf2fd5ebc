//! Contactless reader session.
//!
//! This crate ties a [`CardReader`](cardtap_hardware::CardReader) to a
//! snapshot store and keeps it running:
//!
//! - [`Session`] supervises the reader lifecycle (initialization with
//!   retries, scanning, reconnection after transport failures)
//! - [`ScanPipeline`] turns card presentations into debounced, persisted
//!   scan records with operator feedback
//! - [`SessionHandle`] is the query and command surface for outer layers
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use cardtap_hardware::mock::MockReader;
//! use cardtap_session::{Session, SessionConfig};
//! use cardtap_storage::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (reader, cards) = MockReader::new();
//!     let session = Arc::new(
//!         Session::builder(reader, Arc::new(MemoryStore::new()))
//!             .with_config(SessionConfig::default())
//!             .build()?,
//!     );
//!     let handle = session.handle();
//!
//!     let supervisor = tokio::spawn({
//!         let session = Arc::clone(&session);
//!         async move { session.run().await }
//!     });
//!
//!     cards.present_card(vec![0x04, 0xAB, 0xCD, 0xEF]).await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!     println!("Latest: {}", handle.latest_identifier());
//!
//!     handle.shutdown();
//!     supervisor.await??;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod handle;
pub mod ledger;
pub mod observer;
pub mod pipeline;
pub mod state;
pub mod supervisor;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use error::{ExportError, ScanError, SessionError};
pub use handle::{SessionHandle, UniqueIdentifiers};
pub use ledger::{Ledger, ScanLedger};
pub use observer::{ScanEvent, ScanObserver};
pub use pipeline::{Iteration, LoopExit, ScanPipeline};
pub use state::{ConnectionStatus, SessionState, SessionStateMachine, StateTransition};
pub use supervisor::{Session, SessionBuilder};
