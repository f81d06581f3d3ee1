use async_trait::async_trait;
use parley_channels::{Channel, ChannelError, OutboundMessage, TextFormat, ADAPTIVE_CARD_CONTENT_TYPE};
use parley_core::types::Attachment;
use tracing::debug;

use crate::client::WebexClient;
use crate::types::CreateMessageRequest;

#[async_trait]
impl Channel for WebexClient {
    fn name(&self) -> &str {
        "webex"
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<String, ChannelError> {
        let request = create_message_request(msg)?;
        let created = self.create_message(&request).await?;
        debug!(message_id = %created.id, "message sent");
        Ok(created.id)
    }
}

/// Translate an outbound message into the API request body.
///
/// The room addresses the message when known; a direct message to the
/// person is the fallback.
pub fn create_message_request(msg: &OutboundMessage) -> Result<CreateMessageRequest, ChannelError> {
    msg.message.validate()?;

    let recipient = &msg.recipient;
    let mut request = CreateMessageRequest {
        parent_id: msg.message.parent_id.clone(),
        text: msg.message.plain_text.clone(),
        file: msg.message.file.clone(),
        ..Default::default()
    };

    if recipient.room_id.is_empty() {
        request.to_person_id = Some(recipient.person_id.clone());
    } else {
        request.room_id = Some(recipient.room_id.clone());
    }

    if !msg.message.text.is_empty() {
        match msg.message.format {
            TextFormat::Markdown => request.markdown = Some(msg.message.text.clone()),
            TextFormat::Html => request.html = Some(msg.message.text.clone()),
        }
    }

    if let Some(card) = &msg.message.card {
        request.attachments.push(Attachment {
            content_type: ADAPTIVE_CARD_CONTENT_TYPE.to_string(),
            content: card.clone(),
        });
    }

    Ok(request)
}
