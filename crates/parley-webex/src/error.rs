use parley_channels::ChannelError;

/// Errors produced by the Webex client.
#[derive(Debug, thiserror::Error)]
pub enum WebexError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer from the API.
    #[error("Webex API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        errors: Vec<String>,
        tracking_id: Option<String>,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unable to decode the response body: {0}")]
    Decode(String),
}

impl WebexError {
    /// HTTP status of an API error, `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            WebexError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

impl From<WebexError> for ChannelError {
    fn from(e: WebexError) -> Self {
        match e {
            WebexError::Api {
                status,
                message,
                tracking_id,
                ..
            } => ChannelError::Remote {
                status,
                message,
                tracking_id,
            },
            WebexError::InvalidRequest(reason) => ChannelError::InvalidMessage(reason),
            WebexError::Http(e) if e.is_timeout() => ChannelError::SendFailed(format!("timed out: {e}")),
            other => ChannelError::SendFailed(other.to_string()),
        }
    }
}
