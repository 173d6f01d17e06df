use thiserror::Error;

/// Failures of a connection attempt or a live session.
///
/// Each one ends the attempt: state returns to idle and every held
/// resource is released. Nothing is retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),

    #[error("microphone access denied: {0}")]
    MediaAccessDenied(String),

    #[error("peer transport setup failed: {0}")]
    Transport(String),

    #[error("negotiation failed: {0}")]
    NegotiationFailed(String),

    #[error("connection timed out")]
    ConnectionTimeout,

    #[error("connection failed")]
    ConnectionFailed,
}

impl SessionError {
    /// Short text for the toast
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::CredentialUnavailable(_) => "Unable to connect",
            SessionError::MediaAccessDenied(_) => "Microphone access denied",
            SessionError::Transport(_) => "Unable to connect",
            SessionError::NegotiationFailed(_) => "Voice service unavailable",
            SessionError::ConnectionTimeout => "Connection timeout",
            SessionError::ConnectionFailed => "Connection failed",
        }
    }
}
