//! Error types for session negotiation

use crate::peer::NegotiationOp;

/// Result type alias using the crate Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while negotiating a session
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error (encoding an outbound signaling message)
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Signaling transport error (connect, send or receive failure)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The negotiation primitive rejected an offer/answer/description
    #[error("Negotiation failed during {op}: {reason}")]
    Negotiation {
        /// Which primitive operation was rejected
        op: NegotiationOp,
        /// Failure reason reported by the primitive
        reason: String,
    },

    /// The negotiation round did not complete within the configured deadline
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// WebRTC library error outside the negotiation operations proper
    #[error("WebRTC error: {0}")]
    WebRtc(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable by reconnecting and restarting the round
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Timeout(_) | Error::Io(_)
        )
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }

    /// Check if this error means the negotiation primitive rejected the round
    pub fn is_negotiation_error(&self) -> bool {
        matches!(self, Error::Negotiation { .. })
    }
}
