use thiserror::Error;

/// Top-level error type for the mentor system.
///
/// Subsystem crates define their own error types and implement
/// `From<MentorError>` so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MentorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Dictation error: {0}")]
    Dictation(String),
}

impl From<toml::de::Error> for MentorError {
    fn from(err: toml::de::Error) -> Self {
        MentorError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MentorError {
    fn from(err: toml::ser::Error) -> Self {
        MentorError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MentorError {
    fn from(err: serde_json::Error) -> Self {
        MentorError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for mentor operations.
pub type Result<T> = std::result::Result<T, MentorError>;
