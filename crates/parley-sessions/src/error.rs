use parley_channels::ChannelError;
use thiserror::Error;

/// Terminal outcome of a dialog step or of a whole dialog task.
#[derive(Debug, Error)]
pub enum DialogError {
    /// The session was stopped: preempted by a newer session for the same
    /// key, or the router shut down.
    #[error("the dialog was cancelled")]
    Cancelled,

    /// Sending failed, or the message was rejected before sending.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The user's submission could not be decoded.
    #[error("conversation protocol error: {0}")]
    Protocol(String),

    /// The task panicked; the payload message is kept for the log.
    #[error("the dialog is recovered from panic: {0}")]
    Panicked(String),

    /// Business error raised by the dialog task itself.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DialogError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DialogError::Cancelled)
    }
}
