use async_trait::async_trait;

use crate::{error::ChannelError, types::OutboundMessage};

/// Outbound side of a messaging platform.
///
/// Implementations must be `Send + Sync`: one instance is shared by every
/// session worker and called from many Tokio tasks at once.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable lowercase identifier for this channel (e.g. `"webex"`).
    fn name(&self) -> &str;

    /// Deliver a single message and return the platform's message id.
    ///
    /// Errors are returned as-is; callers decide whether to retry. The
    /// session core never does.
    async fn send(&self, msg: &OutboundMessage) -> Result<String, ChannelError>;
}
