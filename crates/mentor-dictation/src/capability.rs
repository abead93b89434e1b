//! Platform speech-recognition seam.
//!
//! A [`VoiceCapabilityProvider`] is probed once when a session starts. Platforms
//! without dictation support use [`NoopCapabilityProvider`].

use mentor_core::config::VoiceConfig;
use mentor_core::error::MentorError;

/// Recognition settings handed to the platform recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub locale: String,
    pub interim_results: bool,
    /// `false` captures a single utterance and then ends.
    pub continuous: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self::from(&VoiceConfig::default())
    }
}

impl From<&VoiceConfig> for RecognitionConfig {
    fn from(config: &VoiceConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            interim_results: config.interim_results,
            continuous: config.continuous,
        }
    }
}

/// Events delivered by the platform recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Non-final transcript for live feedback.
    Interim(String),
    /// Finalized transcript segment.
    Final(String),
    /// Recognition failed.
    Error(String),
    /// The utterance ended naturally.
    End,
}

/// A platform speech recognizer instance, owned by one session.
pub trait SpeechRecognizer: Send {
    /// Begin capturing audio.
    fn start(&mut self, config: &RecognitionConfig) -> Result<(), MentorError>;

    /// Stop capturing. Pending final results may still be delivered.
    fn stop(&mut self);
}

/// Resolves the platform's dictation capability.
pub trait VoiceCapabilityProvider: Send + Sync {
    /// A fresh recognizer, or `None` when the platform has no dictation support.
    fn recognizer(&self) -> Option<Box<dyn SpeechRecognizer>>;
}

/// Provider for platforms without speech recognition.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCapabilityProvider;

impl VoiceCapabilityProvider for NoopCapabilityProvider {
    fn recognizer(&self) -> Option<Box<dyn SpeechRecognizer>> {
        None
    }
}
