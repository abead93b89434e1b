//! Error types for the chat pipeline.

use mentor_core::error::MentorError;

/// Errors from the chat pipeline.
///
/// Once a send is accepted the pipeline recovers from every variant below
/// `SendInProgress` internally; callers only ever see input rejections.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("a reply is still being generated")]
    SendInProgress,
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("inference error: {0}")]
    Inference(String),
    #[error("metrics error: {0}")]
    Metrics(String),
    #[error("speech error: {0}")]
    Speech(String),
}

impl From<MentorError> for ChatError {
    fn from(err: MentorError) -> Self {
        ChatError::Persistence(err.to_string())
    }
}
