//! Mock contactless reader for testing and development.
//!
//! This module provides a simulated reader that can be controlled
//! programmatically: cards are presented through a handle, failures can be
//! injected on the read channel or during initialization, and every
//! feedback call (display, backlight, control commands) is recorded.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{HardwareError, Result, traits::CardReader, types::DisplayText};

/// Response status returned for every accepted control command.
const CONTROL_OK: [u8; 2] = [0x90, 0x00];

/// Mock reader for testing and development.
///
/// # Examples
///
/// ```
/// use cardtap_hardware::mock::MockReader;
/// use cardtap_hardware::traits::CardReader;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> cardtap_hardware::Result<()> {
///     let (reader, handle) = MockReader::new();
///     reader.initialize().await?;
///
///     handle.present_card(vec![0x04, 0xAB, 0xCD, 0xEF]).await?;
///
///     let uid = reader.read_uid(&CancellationToken::new()).await?;
///     assert_eq!(uid, vec![0x04, 0xAB, 0xCD, 0xEF]);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    /// Device name
    name: String,

    /// State shared with the handle
    state: Arc<Mutex<MockState>>,

    /// Channel receiver for read events
    events: tokio::sync::Mutex<mpsc::Receiver<ReadEvent>>,

    /// Wakes a pending read when the reader is unplugged
    link_lost: Arc<Notify>,
}

impl MockReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns a tuple of (MockReader, MockReaderHandle) where the handle
    /// can be used to simulate card presentations and device faults.
    pub fn new() -> (Self, MockReaderHandle) {
        Self::with_name("Mock NFC Reader")
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockReaderHandle) {
        let name = name.into();
        let (event_tx, event_rx) = mpsc::channel(32);
        let state = Arc::new(Mutex::new(MockState::default()));
        let link_lost = Arc::new(Notify::new());

        let reader = Self {
            name: name.clone(),
            state: Arc::clone(&state),
            events: tokio::sync::Mutex::new(event_rx),
            link_lost: Arc::clone(&link_lost),
        };

        let handle = MockReaderHandle {
            event_tx,
            name,
            state,
            link_lost,
        };

        (reader, handle)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    fn ensure_plugged_in(&self) -> Result<()> {
        if self.state().plugged_in {
            Ok(())
        } else {
            Err(HardwareError::ReaderNotConnected)
        }
    }
}

impl CardReader for MockReader {
    async fn initialize(&self) -> Result<()> {
        let mut state = self.state();
        state.init_calls += 1;
        state.initialized = false;

        if !state.plugged_in {
            return Err(HardwareError::ReaderNotConnected);
        }
        if state.pending_init_failures > 0 {
            state.pending_init_failures -= 1;
            return Err(HardwareError::initialization_failed(format!(
                "{} did not answer",
                self.name
            )));
        }

        state.initialized = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        let state = self.state();
        state.initialized && state.plugged_in && state.ready
    }

    fn reader_name(&self) -> Option<String> {
        self.state().initialized.then(|| self.name.clone())
    }

    async fn read_uid(&self, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let mut events = self.events.lock().await;

        // Registered before the plug check so an unplug in between is seen.
        let link_lost = self.link_lost.notified();
        self.ensure_plugged_in()?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HardwareError::Cancelled),
            _ = link_lost => Err(HardwareError::disconnected(self.name.clone())),
            event = events.recv() => match event {
                Some(ReadEvent::Card(uid)) => Ok(uid),
                Some(ReadEvent::Fail(error)) => Err(error),
                None => Err(HardwareError::disconnected("reader event channel closed")),
            },
        }
    }

    async fn stop_read(&self) -> Result<()> {
        self.ensure_plugged_in()?;
        self.state().stop_read_calls += 1;
        Ok(())
    }

    async fn write_display(&self, line1: &str, line2: &str) -> Result<()> {
        self.ensure_plugged_in()?;
        let text = DisplayText::new(line1, line2);

        let mut state = self.state();
        state.display_log.push(text.clone());
        state.display = Some(text);
        Ok(())
    }

    async fn clear_display(&self) -> Result<()> {
        self.ensure_plugged_in()?;
        self.state().display = None;
        Ok(())
    }

    async fn set_backlight(&self, on: bool) -> Result<()> {
        self.ensure_plugged_in()?;
        self.state().backlight = on;
        Ok(())
    }

    async fn transmit_control(&self, command: &[u8]) -> Result<Vec<u8>> {
        self.ensure_plugged_in()?;

        let mut state = self.state();
        if state.control_fails {
            return Err(HardwareError::communication("control command rejected"));
        }
        state.control_log.push(command.to_vec());
        Ok(CONTROL_OK.to_vec())
    }
}

/// Internal event type delivered to a pending read.
#[derive(Debug)]
enum ReadEvent {
    Card(Vec<u8>),
    Fail(HardwareError),
}

#[derive(Debug)]
struct MockState {
    plugged_in: bool,
    initialized: bool,
    ready: bool,
    pending_init_failures: u32,
    control_fails: bool,
    init_calls: u32,
    stop_read_calls: u32,
    backlight: bool,
    display: Option<DisplayText>,
    display_log: Vec<DisplayText>,
    control_log: Vec<Vec<u8>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            plugged_in: true,
            initialized: false,
            ready: true,
            pending_init_failures: 0,
            control_fails: false,
            init_calls: 0,
            stop_read_calls: 0,
            backlight: false,
            display: None,
            display_log: Vec::new(),
            control_log: Vec::new(),
        }
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle for controlling a mock reader.
///
/// Clones share the same reader: a card presented through any clone is
/// delivered to the one pending read.
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    /// Channel sender for read events
    event_tx: mpsc::Sender<ReadEvent>,

    /// Device name
    name: String,

    /// State shared with the reader
    state: Arc<Mutex<MockState>>,

    /// Wakes a pending read when the reader is unplugged
    link_lost: Arc<Notify>,
}

impl MockReaderHandle {
    /// Present a card with the given UID bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn present_card(&self, uid: impl Into<Vec<u8>>) -> Result<()> {
        self.send(ReadEvent::Card(uid.into())).await
    }

    /// Make the next pending read fail with `error`.
    pub async fn fail_next_read(&self, error: HardwareError) -> Result<()> {
        self.send(ReadEvent::Fail(error)).await
    }

    /// Unplug the reader: a pending read fails with a transport error and
    /// every later call fails until [`plug_in`](Self::plug_in).
    pub fn unplug(&self) {
        lock(&self.state).plugged_in = false;
        self.link_lost.notify_waiters();
    }

    /// Reattach the reader.
    pub fn plug_in(&self) {
        lock(&self.state).plugged_in = true;
    }

    /// Make the next `count` calls to `initialize` fail.
    pub fn fail_initializations(&self, count: u32) {
        lock(&self.state).pending_init_failures = count;
    }

    /// Control the liveness check result.
    pub fn set_ready(&self, ready: bool) {
        lock(&self.state).ready = ready;
    }

    /// Make control commands (beep) fail.
    pub fn set_control_fails(&self, fails: bool) {
        lock(&self.state).control_fails = fails;
    }

    /// Text currently on the display, `None` when blank.
    pub fn display(&self) -> Option<DisplayText> {
        lock(&self.state).display.clone()
    }

    /// Every text written to the display, oldest first.
    pub fn display_log(&self) -> Vec<DisplayText> {
        lock(&self.state).display_log.clone()
    }

    /// Control commands accepted by the reader, oldest first.
    pub fn control_log(&self) -> Vec<Vec<u8>> {
        lock(&self.state).control_log.clone()
    }

    pub fn backlight(&self) -> bool {
        lock(&self.state).backlight
    }

    pub fn init_calls(&self) -> u32 {
        lock(&self.state).init_calls
    }

    pub fn stop_read_calls(&self) -> u32 {
        lock(&self.state).stop_read_calls
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, event: ReadEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("reader event channel closed"))
    }
}
