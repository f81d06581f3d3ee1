use std::time::Duration;

use parley_core::config::WebexConfig;
use parley_core::types::{AttachmentAction, PlatformMessage};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::WebexError;
use crate::types::{ApiErrorBody, CreateMessageRequest, CreateWebhookRequest, Person, Webhook};

/// Thin async client for the Webex REST API, authenticated with a bot token.
#[derive(Clone)]
pub struct WebexClient {
    client: reqwest::Client,
    token: String,
    base_url: Url,
}

impl WebexClient {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self, WebexError> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| WebexError::InvalidRequest(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(WebexError::InvalidRequest(format!(
                "invalid base URL '{base_url}': not a hierarchical URL"
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            token: token.into(),
            base_url,
        })
    }

    pub fn from_config(config: &WebexConfig) -> Result<Self, WebexError> {
        Self::new(
            config.token.clone(),
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// `GET /people/me`: the identity behind the token.
    pub async fn get_my_own_details(&self) -> Result<Person, WebexError> {
        let url = self.url(&["people", "me"]);
        debug!("fetching own person details");
        let resp = self.client.get(url).bearer_auth(&self.token).send().await?;
        decode(resp).await
    }

    /// `POST /messages`.
    pub async fn create_message(&self, req: &CreateMessageRequest) -> Result<PlatformMessage, WebexError> {
        let url = self.url(&["messages"]);
        let builder = self.client.post(url).bearer_auth(&self.token);

        let builder = match &req.file {
            Some(_) if !req.attachments.is_empty() => {
                return Err(WebexError::InvalidRequest(
                    "a message cannot contain both a file and an attachment".into(),
                ));
            }
            Some(file) => {
                debug!(file = %file.name, "sending message with a file");
                builder.multipart(multipart_form(req, file.name.clone(), file.content.clone()))
            }
            None => builder.json(req),
        };

        let resp = builder.send().await?;
        decode(resp).await
    }

    /// `GET /messages/{id}`.
    pub async fn get_message(&self, message_id: &str) -> Result<PlatformMessage, WebexError> {
        require_id("message", message_id)?;
        let url = self.url(&["messages", message_id]);
        let resp = self.client.get(url).bearer_auth(&self.token).send().await?;
        decode(resp).await
    }

    /// `GET /attachment/actions/{id}`.
    pub async fn get_attachment_action(&self, action_id: &str) -> Result<AttachmentAction, WebexError> {
        require_id("attachment action", action_id)?;
        let url = self.url(&["attachment", "actions", action_id]);
        let resp = self.client.get(url).bearer_auth(&self.token).send().await?;
        decode(resp).await
    }

    /// `POST /webhooks`.
    pub async fn create_webhook(&self, req: &CreateWebhookRequest) -> Result<Webhook, WebexError> {
        let url = self.url(&["webhooks"]);
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(req)
            .send()
            .await?;
        decode(resp).await
    }

    /// Base URL plus `segments`, each percent-encoded as one path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

fn require_id(what: &str, id: &str) -> Result<(), WebexError> {
    if id.is_empty() {
        return Err(WebexError::InvalidRequest(format!(
            "the {what} identifier is not specified"
        )));
    }
    Ok(())
}

fn multipart_form(req: &CreateMessageRequest, file_name: String, content: Vec<u8>) -> Form {
    let mut form = Form::new();
    let fields = [
        ("roomId", &req.room_id),
        ("parentId", &req.parent_id),
        ("toPersonId", &req.to_person_id),
        ("toPersonEmail", &req.to_person_email),
        ("text", &req.text),
        ("markdown", &req.markdown),
        ("html", &req.html),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            form = form.text(name, value.clone());
        }
    }

    let part = Part::bytes(content).file_name(file_name);
    form.part("files", part)
}

/// Map a response to `T` on 2xx, or to [`WebexError::Api`] otherwise.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, WebexError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        // Some gateways answer with an HTML or empty body; keep the raw text then.
        let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_else(|_| ApiErrorBody {
            message: text.clone(),
            ..Default::default()
        });
        warn!(status = status.as_u16(), message = %body.message, "Webex API error");
        return Err(WebexError::Api {
            status: status.as_u16(),
            message: body.message,
            errors: body.errors.into_iter().map(|e| e.description).collect(),
            tracking_id: body.tracking_id,
        });
    }

    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| WebexError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> WebexClient {
        WebexClient::new("t", "https://example.test/v1/", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn url_joins_segments_without_double_slash() {
        assert_eq!(
            client().url(&["attachment", "actions", "a-1"]).as_str(),
            "https://example.test/v1/attachment/actions/a-1"
        );
    }

    #[test]
    fn ids_cannot_change_the_request_path() {
        assert_eq!(
            client().url(&["messages", "a/b?c#d"]).as_str(),
            "https://example.test/v1/messages/a%2Fb%3Fc%23d"
        );
        assert_eq!(client().url(&["messages", "../webhooks"]).path(), "/v1/messages/..%2Fwebhooks");
    }

    #[test]
    fn unusable_base_url_is_rejected() {
        let err = WebexClient::new("t", "not a url", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, WebexError::InvalidRequest(_)));

        let err = WebexClient::new("t", "mailto:bot@example.test", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, WebexError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn empty_ids_are_rejected_before_any_request() {
        let err = client().get_message("").await.unwrap_err();
        assert!(matches!(err, WebexError::InvalidRequest(_)));

        let err = client().get_attachment_action("").await.unwrap_err();
        assert!(matches!(err, WebexError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn file_and_attachment_together_are_rejected() {
        let req = CreateMessageRequest {
            room_id: Some("r-1".into()),
            file: Some(parley_channels::File::new("a.txt", b"a".to_vec())),
            attachments: vec![parley_core::types::Attachment {
                content_type: "x".into(),
                content: serde_json::json!({}),
            }],
            ..Default::default()
        };
        let err = client().create_message(&req).await.unwrap_err();
        assert!(matches!(err, WebexError::InvalidRequest(_)));
    }
}
