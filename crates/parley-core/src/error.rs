use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid session key: {0}")]
    InvalidKey(String),
}

impl ParleyError {
    /// Short stable error code, used in log fields.
    pub fn code(&self) -> &'static str {
        match self {
            ParleyError::Config(_) => "CONFIG_ERROR",
            ParleyError::InvalidKey(_) => "INVALID_KEY",
        }
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;
