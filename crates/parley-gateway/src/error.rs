use parley_core::ParleyError;
use parley_webex::WebexError;

/// Errors that stop the bot from starting or keep it from running.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("the bot configuration is not valid: {0}")]
    Config(#[from] ParleyError),

    #[error("dialog task provider must be specified")]
    MissingProvider,

    #[error("Webex API call failed: {0}")]
    Webex(#[from] WebexError),

    #[error("unable to create the {name}: {source}")]
    Registration {
        name: &'static str,
        #[source]
        source: WebexError,
    },

    #[error("webhook server failed: {0}")]
    Server(#[from] std::io::Error),

    #[error("session router task failed: {0}")]
    Router(String),
}
