//! Voice input bridge: dictation as an alternate input channel.
//!
//! The bridge owns one recognizer per session. Finalized segments are
//! committed to the shared [`InputBuffer`]; interim transcripts are only
//! exposed for live feedback. Errors and natural end-of-utterance always
//! return the bridge to Idle.

use std::sync::{Mutex, MutexGuard};

use mentor_core::config::VoiceConfig;
use mentor_core::error::MentorError;

use crate::buffer::InputBuffer;
use crate::capability::{
    RecognitionConfig, RecognitionEvent, SpeechRecognizer, VoiceCapabilityProvider,
};
use crate::state::{ListeningState, StateMachine};

pub struct VoiceInputBridge {
    recognizer: Mutex<Option<Box<dyn SpeechRecognizer>>>,
    available: bool,
    state: StateMachine,
    config: RecognitionConfig,
    buffer: InputBuffer,
    interim: Mutex<Option<String>>,
}

impl std::fmt::Debug for VoiceInputBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceInputBridge")
            .field("available", &self.available)
            .field("state", &self.state)
            .field("config", &self.config)
            .finish()
    }
}

impl VoiceInputBridge {
    /// Probe the provider once and build the bridge.
    ///
    /// Disabled voice input is treated the same as a missing capability.
    pub fn new(
        provider: &dyn VoiceCapabilityProvider,
        config: &VoiceConfig,
        buffer: InputBuffer,
    ) -> Self {
        let recognizer = if config.enabled {
            provider.recognizer()
        } else {
            None
        };
        let available = recognizer.is_some();
        if !available {
            tracing::info!("Voice dictation unavailable; control hidden");
        }

        Self {
            recognizer: Mutex::new(recognizer),
            available,
            state: StateMachine::new(),
            config: RecognitionConfig::from(config),
            buffer,
            interim: Mutex::new(None),
        }
    }

    /// Result of the one-time capability probe.
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn state(&self) -> ListeningState {
        self.state.current()
    }

    pub fn is_listening(&self) -> bool {
        self.state.current() == ListeningState::Listening
    }

    /// Latest interim transcript while listening.
    pub fn interim(&self) -> Option<String> {
        lock(&self.interim).clone()
    }

    /// The committed input buffer this bridge writes to.
    pub fn buffer(&self) -> &InputBuffer {
        &self.buffer
    }

    /// Begin capture. No-op when unavailable or already listening.
    pub fn start(&self) -> Result<(), MentorError> {
        if !self.available || self.is_listening() {
            return Ok(());
        }

        let mut recognizer = lock(&self.recognizer);
        let Some(recognizer) = recognizer.as_mut() else {
            return Ok(());
        };

        self.state.transition(ListeningState::Listening)?;
        if let Err(e) = recognizer.start(&self.config) {
            tracing::warn!(error = %e, "Speech recognizer failed to start");
            self.state.reset();
            return Err(e);
        }
        tracing::debug!(locale = %self.config.locale, "Dictation started");
        Ok(())
    }

    /// Stop capture. No-op when unavailable or idle.
    pub fn stop(&self) {
        if !self.available || !self.is_listening() {
            return;
        }
        if let Some(recognizer) = lock(&self.recognizer).as_mut() {
            recognizer.stop();
        }
        self.return_to_idle();
        tracing::debug!("Dictation stopped");
    }

    /// Start when idle, stop when listening.
    pub fn toggle(&self) -> Result<(), MentorError> {
        if self.is_listening() {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Apply an event from the platform recognizer.
    pub fn handle_event(&self, event: RecognitionEvent) {
        if !self.available {
            return;
        }
        match event {
            RecognitionEvent::Interim(text) => {
                if self.is_listening() && self.config.interim_results {
                    *lock(&self.interim) = Some(text);
                }
            }
            RecognitionEvent::Final(text) => {
                // Finals may arrive just after stop(); they are still committed.
                self.buffer.append_segment(&text);
                *lock(&self.interim) = None;
            }
            RecognitionEvent::Error(reason) => {
                tracing::warn!(reason = %reason, "Speech recognition error");
                self.return_to_idle();
            }
            RecognitionEvent::End => {
                self.return_to_idle();
            }
        }
    }

    /// Stop capture and drop the recognizer. Called on session teardown.
    pub fn release(&self) {
        self.stop();
        lock(&self.recognizer).take();
    }

    fn return_to_idle(&self) {
        self.state.reset();
        *lock(&self.interim) = None;
    }
}

impl Drop for VoiceInputBridge {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
