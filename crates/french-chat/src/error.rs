use thiserror::Error;

use french_core::error::FrenchError;

/// Errors surfaced to the caller of a conversation turn.
///
/// Only request-validation failures reach the caller; everything that goes
/// wrong past validation is recovered inside the pipeline and shows up as a
/// degraded reply instead.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),

    #[error("The mediator does not send inbound messages")]
    MediatorAsSpeaker,
}

impl From<ChatError> for FrenchError {
    fn from(err: ChatError) -> Self {
        FrenchError::Api(err.to_string())
    }
}
