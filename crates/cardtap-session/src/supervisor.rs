//! Session supervisor: owns the reader lifecycle.
//!
//! [`Session::run`] brings the reader online with a bounded number of
//! attempts, prepares it, drives the [`ScanPipeline`] and, when the reader
//! is lost, waits out a cooldown and starts a fresh initialization cycle.
//! Recorded scans survive reconnections; the snapshot store is only read
//! on the first successful initialization.
//!
//! Every state change is published as one [`ConnectionStatus`] value
//! through a `watch` channel. Each scan loop runs under a child of the
//! session's shutdown token, so both shutdown and an explicit reconnect
//! request abort a pending read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use cardtap_hardware::{CardReader, HardwareError};
use cardtap_storage::SnapshotStore;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::handle::SessionHandle;
use crate::ledger::Ledger;
use crate::observer::ScanObserver;
use crate::pipeline::{LoopExit, ScanPipeline, pause};
use crate::state::{ConnectionStatus, SessionStateMachine, StateTransition};

/// State shared between the supervisor and its handles.
pub(crate) struct Shared<R> {
    pub(crate) reader: Arc<R>,
    pub(crate) ledger: Arc<Ledger>,
    machine: Mutex<SessionStateMachine>,
    status: watch::Sender<ConnectionStatus>,
    shutdown: CancellationToken,
    scan_loop: Mutex<Option<CancellationToken>>,
}

impl<R> Shared<R> {
    /// Apply a state machine operation and publish the resulting status.
    fn transition<T>(
        &self,
        apply: impl FnOnce(&mut SessionStateMachine) -> cardtap_core::Result<T>,
    ) -> Result<T, SessionError> {
        let mut machine = lock(&self.machine);
        let from = machine.current_state();
        let value = apply(&mut machine)?;
        debug!("Session state {} -> {}", from, machine.current_state());
        self.status.send_replace(machine.status());
        Ok(value)
    }

    fn scan_loop(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        lock(&self.scan_loop)
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub(crate) fn recent_transitions(&self, count: usize) -> Vec<StateTransition> {
        lock(&self.machine).last_transitions(count)
    }

    /// Abort the running scan loop, if any.
    pub(crate) fn request_reconnect(&self) -> bool {
        match self.scan_loop().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the running flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A supervised reader session.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use cardtap_hardware::mock::MockReader;
/// use cardtap_session::Session;
/// use cardtap_storage::JsonFileStore;
///
/// # async fn example() -> Result<(), cardtap_session::SessionError> {
/// let (reader, _cards) = MockReader::new();
/// let session = Arc::new(Session::builder(reader, Arc::new(JsonFileStore::new("./data"))).build()?);
///
/// let handle = session.handle();
/// let supervisor = tokio::spawn({
///     let session = Arc::clone(&session);
///     async move { session.run().await }
/// });
///
/// println!("Latest: {}", handle.latest_identifier());
/// handle.shutdown();
/// # let _ = supervisor.await;
/// # Ok(())
/// # }
/// ```
pub struct Session<R> {
    shared: Arc<Shared<R>>,
    pipeline: ScanPipeline<R>,
    config: SessionConfig,
    running: AtomicBool,
}

impl<R: CardReader> Session<R> {
    /// Start building a session for `reader`, persisting into `store`.
    pub fn builder(reader: R, store: Arc<dyn SnapshotStore>) -> SessionBuilder<R> {
        SessionBuilder {
            reader,
            store,
            config: SessionConfig::default(),
            clock: None,
            observers: Vec::new(),
        }
    }

    /// A cheap handle for queries and commands from other tasks.
    pub fn handle(&self) -> SessionHandle<R> {
        SessionHandle::new(Arc::clone(&self.shared))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the session until shutdown or until initialization gives up.
    ///
    /// # Errors
    ///
    /// - `SessionError::AlreadyRunning` if another `run` of this session
    ///   is in progress
    /// - `SessionError::RetriesExhausted` if every initialization attempt
    ///   of a cycle failed; the session is then `FatallyFailed`
    pub async fn run(&self) -> Result<(), SessionError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyRunning);
        }
        let _running = RunGuard(&self.running);

        self.shared.transition(SessionStateMachine::begin_cycle)?;

        loop {
            if !self.initialize_with_retries().await? {
                return self.finish();
            }

            self.prepare_device().await?;
            self.shared.transition(SessionStateMachine::begin_scanning)?;

            let scan_loop = self.shared.shutdown.child_token();
            *self.shared.scan_loop() = Some(scan_loop.clone());
            let epoch = self.shared.status().epoch;
            let exit = self.pipeline.run(epoch, &scan_loop).await;
            *self.shared.scan_loop() = None;

            if self.shared.shutdown.is_cancelled() {
                return self.finish();
            }

            match exit {
                LoopExit::Cancelled => debug!("Scan loop aborted for reconnect"),
                LoopExit::TransportLost(e) => warn!("Reader disconnected: {}", e),
            }

            self.shared.transition(SessionStateMachine::begin_reconnect)?;
            info!(
                "Reconnecting in {} ms",
                self.config.reconnect_cooldown.as_millis()
            );
            if pause(self.config.reconnect_cooldown, &self.shared.shutdown)
                .await
                .is_err()
            {
                return self.finish();
            }

            self.shared.transition(SessionStateMachine::begin_cycle)?;
        }
    }

    /// Returns `false` if shutdown interrupted the cycle.
    async fn initialize_with_retries(&self) -> Result<bool, SessionError> {
        let max_attempts = self.config.max_init_attempts;

        loop {
            let error = match self.attempt_initialization().await {
                Ok(()) => return Ok(true),
                Err(e) if e.is_cancelled() => return Ok(false),
                Err(e) => e,
            };

            let attempts = self
                .shared
                .transition(SessionStateMachine::record_failed_attempt)?;

            if attempts >= max_attempts {
                error!(
                    "Reader initialization failed after {} attempts: {}",
                    attempts, error
                );
                self.shared.transition(SessionStateMachine::fail_fatally)?;
                return Err(SessionError::RetriesExhausted { attempts });
            }

            warn!(
                "Reader initialization attempt {}/{} failed: {}",
                attempts, max_attempts, error
            );
            if pause(self.config.init_retry_delay, &self.shared.shutdown)
                .await
                .is_err()
            {
                return Ok(false);
            }
        }
    }

    async fn attempt_initialization(&self) -> Result<(), HardwareError> {
        let reader = &self.shared.reader;
        let shutdown = &self.shared.shutdown;

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(HardwareError::Cancelled),
            result = reader.initialize() => result?,
        }

        pause(self.config.settle_delay, shutdown).await?;

        if !reader.is_ready() {
            return Err(HardwareError::initialization_failed(
                "reader exposes no working read capability",
            ));
        }
        Ok(())
    }

    /// Enter `Ready`: restore snapshots once, then light up the display.
    async fn prepare_device(&self) -> Result<(), SessionError> {
        let reader = &self.shared.reader;
        let name = reader
            .reader_name()
            .unwrap_or_else(|| self.config.fallback_device_name.clone());

        info!("Reader connected: {}", name);
        self.shared.transition(|machine| machine.mark_ready(name))?;
        self.shared.ledger.restore_once();

        if let Err(e) = reader.set_backlight(true).await {
            warn!("Failed to switch on backlight: {}", e);
        }
        if let Err(e) = reader.show_idle_prompt().await {
            warn!("Failed to show idle prompt: {}", e);
        }
        Ok(())
    }

    fn finish(&self) -> Result<(), SessionError> {
        self.shared.transition(SessionStateMachine::shut_down)?;
        info!("Session stopped");
        Ok(())
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder<R> {
    reader: R,
    store: Arc<dyn SnapshotStore>,
    config: SessionConfig,
    clock: Option<Arc<dyn Clock>>,
    observers: Vec<Arc<dyn ScanObserver>>,
}

impl<R: CardReader> SessionBuilder<R> {
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `clock` for scan timestamps and debounce decisions.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Notify `observer` of every accepted scan.
    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// # Errors
    ///
    /// Returns `SessionError::Core` if the configuration is invalid.
    pub fn build(self) -> Result<Session<R>, SessionError> {
        self.config.validate()?;

        let reader = Arc::new(self.reader);
        let ledger = Arc::new(Ledger::new(
            self.store,
            self.config.history_capacity,
            self.config.debounce_window,
        ));
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let machine =
            SessionStateMachine::with_fallback_name(self.config.fallback_device_name.clone());
        let (status, status_rx) = watch::channel(machine.status());

        let pipeline = ScanPipeline::new(
            Arc::clone(&reader),
            Arc::clone(&ledger),
            clock,
            self.observers.into(),
            status_rx,
            &self.config,
        );

        let shared = Arc::new(Shared {
            reader,
            ledger,
            machine: Mutex::new(machine),
            status,
            shutdown: CancellationToken::new(),
            scan_loop: Mutex::new(None),
        });

        Ok(Session {
            shared,
            pipeline,
            config: self.config,
            running: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionState;
    use cardtap_hardware::mock::{MockReader, MockReaderHandle};
    use cardtap_storage::MemoryStore;
    use std::time::Duration;

    fn session() -> (Arc<Session<MockReader>>, MockReaderHandle) {
        let (reader, handle) = MockReader::new();
        let session = Session::builder(reader, Arc::new(MemoryStore::new()))
            .build()
            .unwrap();
        (Arc::new(session), handle)
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let (reader, _handle) = MockReader::new();
        let result = Session::builder(reader, Arc::new(MemoryStore::new()))
            .with_config(SessionConfig::default().with_history_capacity(0))
            .build();

        assert!(matches!(result, Err(SessionError::Core(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_is_refused() {
        let (session, _handle) = session();
        let handle = session.handle();

        let first = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.run().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(matches!(
            session.run().await,
            Err(SessionError::AlreadyRunning)
        ));

        handle.shutdown();
        first.await.unwrap().unwrap();
        assert_eq!(handle.connection_status().state, SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_initialization_backoff() {
        let (session, cards) = session();
        cards.fail_initializations(u32::MAX);
        let handle = session.handle();

        let run = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.run().await }
        });
        tokio::time::sleep(Duration::from_secs(7)).await;
        handle.shutdown();

        run.await.unwrap().unwrap();
        let status = handle.connection_status();
        assert_eq!(status.state, SessionState::Disconnected);
        assert_eq!(status.retry_count, 2);
    }
}
