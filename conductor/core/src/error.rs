//! Conversation Errors
//!
//! What a caller of the Conductor can get back from an operation. Every
//! failed operation leaves the conversation exactly as it was.

use thiserror::Error;

use crate::api::ApiError;

/// Lifecycle rule an operation was called in violation of
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PreconditionError {
    /// Operation needs the authentication chain to have completed
    #[error("conversation is not authenticated")]
    NotAuthenticated,

    /// Operation needs an open conversation
    #[error("conversation is not open")]
    NotOpen,

    /// Conversation is already open
    #[error("conversation is already open")]
    AlreadyOpen,

    /// A live subscription is already attached
    #[error("live subscription is already attached")]
    AlreadySubscribed,
}

/// Error returned by Conductor operations
#[derive(Debug, Error)]
pub enum ConversationError {
    /// One of the two token exchanges failed
    #[error("authentication failed: {0}")]
    Auth(#[source] ApiError),

    /// Operation not allowed in the current lifecycle state
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// Open, send or close failed at the transport
    #[error("transport error: {0}")]
    Transport(#[from] ApiError),
}

impl ConversationError {
    /// The precondition that failed, if that is what this is
    #[must_use]
    pub fn precondition(&self) -> Option<PreconditionError> {
        match self {
            Self::Precondition(p) => Some(*p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConversationError::from(PreconditionError::NotOpen);
        assert_eq!(err.to_string(), "precondition failed: conversation is not open");
        assert_eq!(err.precondition(), Some(PreconditionError::NotOpen));

        let err = ConversationError::Auth(ApiError::Network("refused".to_string()));
        assert!(err.to_string().starts_with("authentication failed"));
        assert_eq!(err.precondition(), None);
    }

    #[test]
    fn test_api_error_converts_to_transport() {
        let err: ConversationError = ApiError::Decode("bad".to_string()).into();
        assert!(matches!(err, ConversationError::Transport(ApiError::Decode(_))));
    }
}
