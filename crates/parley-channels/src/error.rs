use thiserror::Error;

/// Errors that can occur while preparing or delivering an outbound message.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The message was rejected before anything was sent.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The transport failed before the remote side answered.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The remote platform answered with an error status.
    #[error("Remote error (status {status}): {message}")]
    Remote {
        status: u16,
        message: String,
        tracking_id: Option<String>,
    },

    /// An operation exceeded its allowed time budget.
    #[error("Operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// A card could not be built from the given content.
    #[error("Card rendering failed: {0}")]
    Render(String),
}

impl ChannelError {
    /// `true` for errors raised before any network effect.
    pub fn is_validation(&self) -> bool {
        matches!(self, ChannelError::InvalidMessage(_) | ChannelError::Render(_))
    }
}
