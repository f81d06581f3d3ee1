use parley_core::{ResourceEvent, ResourceKind};
use parley_webex::{CreateWebhookRequest, WebexClient};
use tracing::info;

use crate::error::GatewayError;

pub const WEBHOOK_PATH: &str = "/webhooks";

const MESSAGE_WEBHOOK: &str = "Message webhook [parley]";
const ATTACHMENT_ACTION_WEBHOOK: &str = "Attachment action webhook [parley]";

/// Register the two webhooks the bot listens on: created messages and
/// created card submissions. An already existing webhook (409) is fine.
pub async fn register_webhooks(
    client: &WebexClient,
    target_url: &str,
    secret: Option<&str>,
) -> Result<(), GatewayError> {
    let hooks = [
        (MESSAGE_WEBHOOK, ResourceKind::Messages),
        (ATTACHMENT_ACTION_WEBHOOK, ResourceKind::AttachmentActions),
    ];

    for (name, resource) in hooks {
        let request = CreateWebhookRequest {
            name: name.to_string(),
            target_url: target_url.to_string(),
            resource,
            event: ResourceEvent::Created,
            filter: None,
            secret: secret.map(String::from),
        };

        match client.create_webhook(&request).await {
            Ok(webhook) => info!(webhook = name, id = %webhook.id, target = %target_url, "webhook created"),
            Err(e) if e.is_conflict() => info!(webhook = name, "webhook already exists"),
            Err(source) => return Err(GatewayError::Registration { name, source }),
        }
    }
    Ok(())
}
