//! Webhook ingress endpoint: POST /webhooks.
//!
//! Turns Webex webhook callbacks into [`Event`]s for the session router:
//! authenticate, decode, fetch the full resource, filter, enqueue.

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use parley_core::types::{AttachmentAction, EventResource, PlatformMessage};
use parley_core::{Event, ResourceKind};
use parley_webex::{WebexClient, WebexError, WebhookCallback};
use serde_json::json;
use sha1::Sha1;
use std::sync::Arc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::{debug, info, instrument, warn};

use crate::app::AppState;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_HEADER: &str = "x-spark-signature";

/// Where the full message or card submission behind a callback comes from.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn message(&self, id: &str) -> Result<PlatformMessage, WebexError>;
    async fn attachment_action(&self, id: &str) -> Result<AttachmentAction, WebexError>;
}

#[async_trait]
impl ResourceSource for WebexClient {
    async fn message(&self, id: &str) -> Result<PlatformMessage, WebexError> {
        self.get_message(id).await
    }

    async fn attachment_action(&self, id: &str) -> Result<AttachmentAction, WebexError> {
        self.get_attachment_action(id).await
    }
}

/// Why a callback was not turned into a routed event.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("authentication failed: {0}")]
    Unauthorized(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unable to reach Webex: {0}")]
    Transport(String),
    #[error("Webex refused the resource lookup: {0}")]
    Upstream(String),
    #[error("the event queue is full")]
    QueueFull,
    #[error("the session router is not running")]
    RouterGone,
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            IngestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            IngestError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            IngestError::Upstream(_) => StatusCode::FAILED_DEPENDENCY,
            IngestError::QueueFull => StatusCode::TOO_MANY_REQUESTS,
            IngestError::RouterGone => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        warn!(status = self.status().as_u16(), error = %self, "webhook callback rejected");
        (self.status(), Json(json!({"error": self.to_string()}))).into_response()
    }
}

// ── Handler ──────────────────────────────────────────────────────────────────

/// POST /webhooks
///
/// 202 once the event is queued for the router, 200 when a filter skipped
/// it. Errors map to 401, 400, 500, 424 and 429.
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, IngestError> {
    if let Some(secret) = state.secret.as_deref() {
        verify_signature(&headers, &body, secret).map_err(IngestError::Unauthorized)?;
    }

    let callback: WebhookCallback = serde_json::from_slice(&body)
        .map_err(|e| IngestError::BadRequest(format!("not a webhook callback: {e}")))?;
    debug!(
        webhook = %callback.name,
        resource = %callback.resource,
        id = %callback.data.id,
        "webhook callback arrived"
    );

    let event = prepare_event(state.resources.as_ref(), callback).await?;

    if !state.matches_filters(&event) {
        info!(kind = %event.resource_kind, "event skipped by filters");
        return Ok(StatusCode::OK);
    }

    enqueue(&state, event).await?;
    Ok(StatusCode::ACCEPTED)
}

// ── Auth ─────────────────────────────────────────────────────────────────────

/// Verify `X-Spark-Signature`: hex HMAC-SHA1 of the raw body.
fn verify_signature(headers: &HeaderMap, body: &[u8], secret: &str) -> Result<(), String> {
    let sig_hex = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| "missing X-Spark-Signature header".to_string())?;

    let expected =
        hex::decode(sig_hex).map_err(|_| "X-Spark-Signature is not valid hex".to_string())?;

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|_| "invalid HMAC key length".to_string())?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| "HMAC signature mismatch".to_string())
}

/// Hex HMAC-SHA1 of `body`, as the platform computes it.
pub fn sign(body: &[u8], secret: &str) -> Result<String, hmac::digest::InvalidLength> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

// ── Event assembly ───────────────────────────────────────────────────────────

#[instrument(skip_all, fields(resource = %callback.resource, id = %callback.data.id))]
async fn prepare_event(
    resources: &dyn ResourceSource,
    callback: WebhookCallback,
) -> Result<Event, IngestError> {
    let id = callback.data.id.as_str();
    if id.is_empty() {
        return Err(IngestError::BadRequest("the callback has no resource id".into()));
    }

    let resource = match callback.resource {
        ResourceKind::Messages => EventResource::Message(
            resources.message(id).await.map_err(|e| lookup_error("message", id, e))?,
        ),
        ResourceKind::AttachmentActions => EventResource::AttachmentAction(
            resources
                .attachment_action(id)
                .await
                .map_err(|e| lookup_error("attachment action", id, e))?,
        ),
        _ => EventResource::Other,
    };

    let (initiator_email, room_id, room_type) = match &resource {
        EventResource::Message(m) => (m.person_email.clone(), m.room_id.clone(), m.room_type),
        EventResource::AttachmentAction(a) => (String::new(), a.room_id.clone(), None),
        EventResource::Other => (
            String::new(),
            callback.data.room_id.clone().unwrap_or_default(),
            None,
        ),
    };

    Ok(Event {
        initiator_id: callback.actor_id,
        initiator_email,
        room_id,
        room_type,
        resource_kind: callback.resource,
        resource_event: callback.event,
        resource,
    })
}

fn lookup_error(what: &str, id: &str, e: WebexError) -> IngestError {
    let reason = format!("unable to get the {what} '{id}': {e}");
    match e {
        WebexError::Http(_) => IngestError::Transport(reason),
        WebexError::InvalidRequest(_) => IngestError::BadRequest(reason),
        WebexError::Api { .. } | WebexError::Decode(_) => IngestError::Upstream(reason),
    }
}

// ── Queue ────────────────────────────────────────────────────────────────────

async fn enqueue(state: &AppState, event: Event) -> Result<(), IngestError> {
    match state.events.send_timeout(event, state.enqueue_deadline).await {
        Ok(()) => Ok(()),
        Err(SendTimeoutError::Timeout(_)) => Err(IngestError::QueueFull),
        Err(SendTimeoutError::Closed(_)) => Err(IngestError::RouterGone),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trip() {
        let body = br#"{"id":"w-1"}"#;
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, sign(body, "s3cret").unwrap().parse().unwrap());

        assert!(verify_signature(&headers, body, "s3cret").is_ok());
        assert!(verify_signature(&headers, body, "other").is_err());
        assert!(verify_signature(&headers, b"tampered", "s3cret").is_err());
    }

    #[test]
    fn missing_or_garbled_signature_is_rejected() {
        let mut headers = HeaderMap::new();
        assert!(verify_signature(&headers, b"{}", "k").unwrap_err().contains("missing"));

        headers.insert(SIGNATURE_HEADER, "zz-not-hex".parse().unwrap());
        assert!(verify_signature(&headers, b"{}", "k").unwrap_err().contains("hex"));
    }

    #[test]
    fn lookup_errors_map_to_statuses() {
        let api = WebexError::Api {
            status: 404,
            message: "not found".into(),
            errors: vec![],
            tracking_id: None,
        };
        assert_eq!(lookup_error("message", "m", api).status(), StatusCode::FAILED_DEPENDENCY);
        assert_eq!(
            lookup_error("message", "m", WebexError::Decode("eof".into())).status(),
            StatusCode::FAILED_DEPENDENCY
        );
    }
}
