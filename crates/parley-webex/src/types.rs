use parley_channels::File;
use parley_core::types::{Attachment, ResourceEvent, ResourceKind};
use serde::{Deserialize, Serialize};

/// Body of `POST /messages`.
///
/// Exactly one of `room_id`, `to_person_id`, `to_person_email` addresses
/// the message. A `file` switches the request to multipart and cannot be
/// combined with `attachments`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_person_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_person_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip)]
    pub file: Option<File>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Active,
    Inactive,
}

/// Body of `POST /webhooks`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebhookRequest {
    pub name: String,
    pub target_url: String,
    pub resource: ResourceKind,
    pub event: ResourceEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target_url: String,
    pub resource: ResourceKind,
    pub event: ResourceEvent,
    pub status: Option<WebhookStatus>,
}

/// Payload the platform POSTs to a registered webhook.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookCallback {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub resource: ResourceKind,
    pub event: ResourceEvent,
    #[serde(default)]
    pub actor_id: String,
    #[serde(default)]
    pub created_by: String,
    /// Minimal resource description; only `id` is relied upon.
    pub data: CallbackData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackData {
    pub id: String,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub person_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub display_name: String,
}

/// Error body of a non-2xx answer.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
    #[serde(default)]
    pub tracking_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_message_request_omits_empty_fields() {
        let req = CreateMessageRequest {
            room_id: Some("r-1".into()),
            markdown: Some("**hi**".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"roomId": "r-1", "markdown": "**hi**"}));
    }

    #[test]
    fn decodes_webhook_callback() {
        let json = r#"{
            "id": "wh-1",
            "name": "Message webhook",
            "resource": "messages",
            "event": "created",
            "actorId": "p-1",
            "data": {"id": "m-1", "roomId": "r-1", "personId": "p-1"}
        }"#;
        let callback: WebhookCallback = serde_json::from_str(json).unwrap();
        assert_eq!(callback.resource, ResourceKind::Messages);
        assert_eq!(callback.event, ResourceEvent::Created);
        assert_eq!(callback.data.id, "m-1");
    }

    #[test]
    fn webhook_request_uses_platform_names() {
        let req = CreateWebhookRequest {
            name: "w".into(),
            target_url: "http://h:1/webhooks".into(),
            resource: ResourceKind::AttachmentActions,
            event: ResourceEvent::Created,
            filter: None,
            secret: Some("s".into()),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["resource"], "attachmentActions");
        assert_eq!(json["event"], "created");
        assert_eq!(json["targetUrl"], "http://h:1/webhooks");
    }
}
