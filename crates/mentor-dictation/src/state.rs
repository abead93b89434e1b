//! Listening state machine with thread-safe transitions.
//!
//! Valid transitions:
//! - Idle -> Listening (capture started)
//! - Listening -> Idle (stopped, error, or end of utterance)
//!
//! `reset()` returns to Idle from any state.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use mentor_core::error::MentorError;

/// Capture state of the voice input bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListeningState {
    /// Not capturing. Ready to start.
    Idle,
    /// Capturing speech from the microphone.
    Listening,
}

impl fmt::Display for ListeningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListeningState::Idle => write!(f, "Idle"),
            ListeningState::Listening => write!(f, "Listening"),
        }
    }
}

impl ListeningState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &ListeningState) -> bool {
        matches!(
            (self, target),
            (ListeningState::Idle, ListeningState::Listening)
                | (ListeningState::Listening, ListeningState::Idle)
        )
    }
}

/// Shared state machine; clones observe the same state.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<ListeningState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ListeningState::Idle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListeningState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the current state.
    pub fn current(&self) -> ListeningState {
        *self.lock()
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: ListeningState) -> Result<(), MentorError> {
        let mut state = self.lock();
        if state.can_transition_to(&target) {
            tracing::debug!("Listening state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(MentorError::Dictation(format!(
                "Invalid state transition: {} -> {}",
                *state, target
            )))
        }
    }

    /// Force the state machine back to Idle.
    pub fn reset(&self) {
        let mut state = self.lock();
        if *state != ListeningState::Idle {
            tracing::debug!("Listening state reset to Idle from {}", *state);
        }
        *state = ListeningState::Idle;
    }
}
