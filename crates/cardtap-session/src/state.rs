//! Reader session state machine.
//!
//! This module tracks where the session is in the reader lifecycle, from
//! bringing the device online through scanning and automatic recovery.
//!
//! # States
//!
//! - `Disconnected`: No reader session active
//! - `Initializing`: Bringing the reader online (possibly retrying)
//! - `Ready`: Reader online, device being prepared for scanning
//! - `Scanning`: Scan loop running
//! - `Reconnecting`: Reader lost, waiting out the cooldown
//! - `FatallyFailed`: Retry budget exhausted; terminal
//!
//! # Valid Transitions
//!
//! - Disconnected → Initializing → Ready → Scanning
//! - Initializing → Initializing (retry) / FatallyFailed
//! - Scanning → Reconnecting → Initializing
//! - Initializing/Ready/Scanning/Reconnecting → Disconnected (shutdown)
//!
//! # Examples
//!
//! ```
//! use cardtap_session::{SessionState, SessionStateMachine};
//!
//! let mut machine = SessionStateMachine::new();
//! machine.begin_cycle().unwrap();
//! machine.mark_ready("ACS ACR1252").unwrap();
//!
//! let status = machine.status();
//! assert_eq!(status.state, SessionState::Ready);
//! assert!(status.connected);
//! assert_eq!(status.epoch, 1);
//! ```

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use cardtap_core::constants::UNKNOWN_READER_NAME;
use cardtap_core::{Error, Result};

/// Maximum number of state transitions kept for diagnostics.
const MAX_HISTORY_SIZE: usize = 100;

/// Lifecycle state of the reader session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session active.
    Disconnected,

    /// Bringing the reader online.
    Initializing,

    /// Reader online; restoring state and preparing the display.
    Ready,

    /// Waiting for and processing card presentations.
    Scanning,

    /// Reader lost; a new initialization cycle follows the cooldown.
    Reconnecting,

    /// Initialization retry budget exhausted.
    FatallyFailed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::Initializing => "Initializing",
            SessionState::Ready => "Ready",
            SessionState::Scanning => "Scanning",
            SessionState::Reconnecting => "Reconnecting",
            SessionState::FatallyFailed => "FatallyFailed",
        };
        write!(f, "{}", state_str)
    }
}

impl SessionState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardtap_session::SessionState;
    ///
    /// assert!(SessionState::Disconnected.can_transition_to(&SessionState::Initializing));
    /// assert!(!SessionState::Disconnected.can_transition_to(&SessionState::Scanning));
    /// assert!(!SessionState::FatallyFailed.can_transition_to(&SessionState::Initializing));
    /// ```
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            // From Disconnected
            (SessionState::Disconnected, SessionState::Initializing)
            // From Initializing
            | (SessionState::Initializing, SessionState::Initializing | SessionState::Ready | SessionState::FatallyFailed)
            // From Ready
            | (SessionState::Ready, SessionState::Scanning)
            // From Scanning
            | (SessionState::Scanning, SessionState::Reconnecting)
            // From Reconnecting
            | (SessionState::Reconnecting, SessionState::Initializing)
            // Shutdown
            | (
                SessionState::Initializing
                    | SessionState::Ready
                    | SessionState::Scanning
                    | SessionState::Reconnecting,
                SessionState::Disconnected
            )
        )
    }

    /// Whether a working reader is attached in this state.
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Ready | SessionState::Scanning)
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::FatallyFailed)
    }
}

/// A single recorded state transition.
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: SessionState,

    /// The state transitioned to.
    pub to: SessionState,

    /// When the transition occurred.
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }
}

/// Snapshot of the session published to observers.
///
/// All fields change together: a reader of the status never sees a state
/// from one cycle paired with the device name of another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Current lifecycle state.
    pub state: SessionState,

    /// Whether a working reader is attached.
    pub connected: bool,

    /// Name of the attached reader, or the fallback name while none is.
    pub device_name: String,

    /// Failed initialization attempts in the current cycle.
    pub retry_count: u32,

    /// Ordinal of the current initialization cycle.
    pub epoch: u64,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        SessionStateMachine::new().status()
    }
}

/// State machine for the reader session lifecycle.
///
/// Besides the state itself it owns the per-cycle retry counter, the
/// current device name and the cycle epoch. While no reader is attached
/// the published status carries the fallback name instead.
///
/// # Thread Safety
///
/// Not synchronized. The supervisor keeps it behind a mutex and publishes
/// [`status`](Self::status) after every change.
#[derive(Debug)]
pub struct SessionStateMachine {
    current_state: SessionState,
    history: VecDeque<StateTransition>,
    retry_count: u32,
    device_name: Option<String>,
    fallback_name: String,
    epoch: u64,
}

impl SessionStateMachine {
    /// Create a new state machine in the `Disconnected` state.
    pub fn new() -> Self {
        Self::with_fallback_name(UNKNOWN_READER_NAME)
    }

    /// Like [`new`](Self::new), reporting `fallback_name` while no reader
    /// is attached.
    pub fn with_fallback_name(fallback_name: impl Into<String>) -> Self {
        Self {
            current_state: SessionState::Disconnected,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            retry_count: 0,
            device_name: None,
            fallback_name: fallback_name.into(),
            epoch: 0,
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.current_state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Get the last N state transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// The publishable view of the machine.
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.current_state,
            connected: self.current_state.is_connected(),
            device_name: self
                .device_name
                .clone()
                .unwrap_or_else(|| self.fallback_name.clone()),
            retry_count: self.retry_count,
            epoch: self.epoch,
        }
    }

    /// Start a new initialization cycle.
    ///
    /// Bumps the epoch and restarts the retry count.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` unless the machine is
    /// `Disconnected` or `Reconnecting`.
    pub fn begin_cycle(&mut self) -> Result<StateTransition> {
        let transition = self.transition_to(SessionState::Initializing)?;
        self.epoch += 1;
        self.retry_count = 0;
        Ok(transition)
    }

    /// Record a failed initialization attempt and return the new retry
    /// count.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` unless the machine is
    /// `Initializing`.
    pub fn record_failed_attempt(&mut self) -> Result<u32> {
        self.transition_to(SessionState::Initializing)?;
        self.retry_count += 1;
        Ok(self.retry_count)
    }

    /// The reader came online under `device_name`.
    pub fn mark_ready(&mut self, device_name: impl Into<String>) -> Result<StateTransition> {
        let transition = self.transition_to(SessionState::Ready)?;
        self.device_name = Some(device_name.into());
        Ok(transition)
    }

    pub fn begin_scanning(&mut self) -> Result<StateTransition> {
        self.transition_to(SessionState::Scanning)
    }

    /// The reader was lost or a restart was requested.
    pub fn begin_reconnect(&mut self) -> Result<StateTransition> {
        let transition = self.transition_to(SessionState::Reconnecting)?;
        self.device_name = None;
        Ok(transition)
    }

    pub fn fail_fatally(&mut self) -> Result<StateTransition> {
        self.transition_to(SessionState::FatallyFailed)
    }

    /// Stop the session.
    pub fn shut_down(&mut self) -> Result<StateTransition> {
        let transition = self.transition_to(SessionState::Disconnected)?;
        self.device_name = None;
        Ok(transition)
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the transition is not
    /// valid for the current state.
    pub fn transition_to(&mut self, new_state: SessionState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.current_state = new_state;
        self.add_to_history(transition.clone());

        Ok(transition)
    }

    fn add_to_history(&mut self, transition: StateTransition) {
        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_new_machine_is_disconnected() {
        let machine = SessionStateMachine::new();
        let status = machine.status();

        assert_eq!(status.state, SessionState::Disconnected);
        assert!(!status.connected);
        assert_eq!(status.device_name, "Unknown Reader");
        assert_eq!(status.epoch, 0);
        assert!(machine.last_transitions(usize::MAX).is_empty());
    }

    #[rstest]
    #[case(SessionState::Disconnected, SessionState::Initializing, true)]
    #[case(SessionState::Initializing, SessionState::Initializing, true)]
    #[case(SessionState::Initializing, SessionState::Ready, true)]
    #[case(SessionState::Initializing, SessionState::FatallyFailed, true)]
    #[case(SessionState::Ready, SessionState::Scanning, true)]
    #[case(SessionState::Scanning, SessionState::Reconnecting, true)]
    #[case(SessionState::Reconnecting, SessionState::Initializing, true)]
    #[case(SessionState::Scanning, SessionState::Disconnected, true)]
    #[case(SessionState::Reconnecting, SessionState::Disconnected, true)]
    #[case(SessionState::Disconnected, SessionState::Scanning, false)]
    #[case(SessionState::Ready, SessionState::Reconnecting, false)]
    #[case(SessionState::Scanning, SessionState::Initializing, false)]
    #[case(SessionState::FatallyFailed, SessionState::Initializing, false)]
    #[case(SessionState::FatallyFailed, SessionState::Disconnected, false)]
    #[case(SessionState::Disconnected, SessionState::Disconnected, false)]
    fn test_transition_table(
        #[case] from: SessionState,
        #[case] to: SessionState,
        #[case] valid: bool,
    ) {
        assert_eq!(from.can_transition_to(&to), valid);
    }

    #[test]
    fn test_full_cycle_updates_status() {
        let mut machine = SessionStateMachine::new();

        machine.begin_cycle().unwrap();
        assert_eq!(machine.record_failed_attempt().unwrap(), 1);
        assert_eq!(machine.record_failed_attempt().unwrap(), 2);
        machine.mark_ready("Desk Reader").unwrap();
        machine.begin_scanning().unwrap();

        let status = machine.status();
        assert_eq!(status.state, SessionState::Scanning);
        assert!(status.connected);
        assert_eq!(status.device_name, "Desk Reader");
        assert_eq!(status.retry_count, 2);
        assert_eq!(status.epoch, 1);
    }

    #[test]
    fn test_reconnect_resets_name_and_starts_new_epoch() {
        let mut machine = SessionStateMachine::new();
        machine.begin_cycle().unwrap();
        machine.record_failed_attempt().unwrap();
        machine.mark_ready("Desk Reader").unwrap();
        machine.begin_scanning().unwrap();

        machine.begin_reconnect().unwrap();
        let status = machine.status();
        assert!(!status.connected);
        assert_eq!(status.device_name, "Unknown Reader");

        machine.begin_cycle().unwrap();
        assert_eq!(machine.retry_count(), 0);
        assert_eq!(machine.epoch(), 2);
    }

    #[test]
    fn test_invalid_transition_leaves_machine_untouched() {
        let mut machine = SessionStateMachine::new();

        let err = machine.begin_scanning().unwrap_err();
        assert_eq!(
            err,
            Error::InvalidStateTransition {
                from: "Disconnected".to_string(),
                to: "Scanning".to_string(),
            }
        );
        assert_eq!(machine.current_state(), SessionState::Disconnected);
        assert!(machine.last_transitions(usize::MAX).is_empty());
    }

    #[test]
    fn test_failed_attempt_outside_initializing_is_rejected() {
        let mut machine = SessionStateMachine::new();
        assert!(machine.record_failed_attempt().is_err());
        assert_eq!(machine.retry_count(), 0);
    }

    #[test]
    fn test_fatal_failure_is_terminal() {
        let mut machine = SessionStateMachine::new();
        machine.begin_cycle().unwrap();
        machine.fail_fatally().unwrap();

        assert!(machine.current_state().is_terminal());
        assert!(machine.shut_down().is_err());
        assert!(machine.begin_cycle().is_err());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut machine = SessionStateMachine::new();
        machine.begin_cycle().unwrap();
        for _ in 0..(MAX_HISTORY_SIZE + 20) {
            machine.record_failed_attempt().unwrap();
        }

        assert_eq!(machine.last_transitions(usize::MAX).len(), MAX_HISTORY_SIZE);
        let last = machine.last_transitions(2);
        assert_eq!(last.len(), 2);
        assert_eq!(last[1].to, SessionState::Initializing);
    }

    #[test]
    fn test_fallback_name_reported_until_ready() {
        let mut machine = SessionStateMachine::with_fallback_name("Front Desk");
        assert_eq!(machine.status().device_name, "Front Desk");

        machine.begin_cycle().unwrap();
        machine.mark_ready("ACS ACR1252").unwrap();
        assert_eq!(machine.status().device_name, "ACS ACR1252");

        machine.shut_down().unwrap();
        assert_eq!(machine.status().device_name, "Front Desk");
    }

    #[test]
    fn test_last_transitions_in_order() {
        let mut machine = SessionStateMachine::new();
        machine.begin_cycle().unwrap();
        machine.mark_ready("Desk Reader").unwrap();
        machine.begin_scanning().unwrap();

        let states: Vec<_> = machine
            .last_transitions(2)
            .iter()
            .map(|t| (t.from, t.to))
            .collect();
        assert_eq!(
            states,
            vec![
                (SessionState::Initializing, SessionState::Ready),
                (SessionState::Ready, SessionState::Scanning),
            ]
        );
    }

    #[test]
    fn test_status_serializes_snake_case_state() {
        let json = serde_json::to_value(ConnectionStatus::default()).unwrap();
        assert_eq!(json["state"], "disconnected");
        assert_eq!(json["connected"], false);
        assert_eq!(json["device_name"], "Unknown Reader");
    }
}
