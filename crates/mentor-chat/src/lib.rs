//! Socratic mentor chat pipeline.
//!
//! Classifies student utterances, generates mentor replies through a tiered
//! inference/fallback chain that never fails, persists both sides of the
//! conversation, and reveals replies with simulated live typing and optional
//! speech output.

pub mod classifier;
pub mod error;
pub mod fallback;
pub mod inference;
pub mod metrics;
pub mod orchestrator;
pub mod presenter;
pub mod prompt;
pub mod random;
pub mod session;
pub mod speech;
pub mod store;

pub use classifier::classify;
pub use error::ChatError;
pub use fallback::{FallbackPool, OFFLINE_MARKER};
pub use inference::{HttpInferenceClient, InferenceClient, InferenceRequest, InferenceResponse};
pub use metrics::{MetricsSink, NoopMetrics, SqliteMetricsSink};
pub use orchestrator::{
    FallbackStrategy, MentorReply, RemoteInferenceStrategy, ReplyContext, ReplySource,
    ReplyStrategy, Resolution, ResponseOrchestrator,
};
pub use presenter::{
    PresenterView, RevealHandle, RevealOutcome, RevealPolicy, StreamingPresenter, TypingState,
};
pub use random::RandomSource;
pub use session::{ChatSession, SendOutcome, SessionDeps};
pub use speech::{sanitize_for_speech, CommandSpeech, NullSpeech, SpeechSynthesizer};
pub use store::{MessageStore, SqliteMessageStore};
