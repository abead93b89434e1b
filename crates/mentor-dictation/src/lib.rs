//! Mentor Dictation crate - optional voice input for the chat box.
//!
//! Wraps a platform speech-recognition capability behind
//! [`VoiceCapabilityProvider`], resolved once per session. The bridge runs a
//! two-state machine (Idle <-> Listening) and commits finalized transcript
//! segments into a shared [`InputBuffer`].

pub mod bridge;
pub mod buffer;
pub mod capability;
pub mod state;

pub use bridge::VoiceInputBridge;
pub use buffer::InputBuffer;
pub use capability::{
    NoopCapabilityProvider, RecognitionConfig, RecognitionEvent, SpeechRecognizer,
    VoiceCapabilityProvider,
};
pub use state::ListeningState;
