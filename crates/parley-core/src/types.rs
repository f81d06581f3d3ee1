use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};

/// Kind of room an event happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    /// One-to-one space between the bot and a single person.
    Direct,
    /// Space with several members.
    Group,
}

/// Platform resource a webhook callback refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    AttachmentActions,
    Memberships,
    Messages,
    Rooms,
    Meetings,
    Recordings,
    MeetingParticipants,
    MeetingTranscripts,
    /// Anything the platform adds later; carried through, never triggers a fetch.
    #[serde(other)]
    Unknown,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::AttachmentActions => "attachmentActions",
            ResourceKind::Memberships => "memberships",
            ResourceKind::Messages => "messages",
            ResourceKind::Rooms => "rooms",
            ResourceKind::Meetings => "meetings",
            ResourceKind::Recordings => "recordings",
            ResourceKind::MeetingParticipants => "meetingParticipants",
            ResourceKind::MeetingTranscripts => "meetingTranscripts",
            ResourceKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceEvent {
    Created,
    Updated,
    Deleted,
    Started,
    Ended,
    Joined,
    Left,
    Migrated,
    /// Only meaningful when registering a webhook.
    All,
    #[serde(other)]
    Unknown,
}

/// A file or card attached to a platform message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    pub content: serde_json::Value,
}

/// A message as the platform reports it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformMessage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<RoomType>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default)]
    pub person_id: String,
    #[serde(default)]
    pub person_email: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentioned_people: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentioned_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_voice_clip: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentActionType {
    Submit,
    #[serde(other)]
    Unknown,
}

/// A user interaction with a card (button press, form submission).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentAction {
    pub id: String,
    #[serde(default)]
    pub person_id: String,
    #[serde(default)]
    pub room_id: String,
    #[serde(rename = "type")]
    pub action_type: AttachmentActionType,
    #[serde(default)]
    pub message_id: String,
    /// Raw submitted inputs; their shape depends on the card that was submitted.
    #[serde(default)]
    pub inputs: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl AttachmentAction {
    pub fn is_submit(&self) -> bool {
        self.action_type == AttachmentActionType::Submit
    }
}

/// The resource an event carries, decoded once at ingestion.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResource {
    Message(PlatformMessage),
    AttachmentAction(AttachmentAction),
    /// A resource kind the gateway does not fetch.
    Other,
}

/// One normalized platform occurrence, addressed to a conversation by
/// initiator and room.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The person who caused the event.
    pub initiator_id: String,
    /// Empty for attachment actions, which do not report an email.
    pub initiator_email: String,
    pub room_id: String,
    /// `None` for attachment actions.
    pub room_type: Option<RoomType>,
    pub resource_kind: ResourceKind,
    pub resource_event: ResourceEvent,
    pub resource: EventResource,
}

impl Event {
    /// The conversation this event belongs to.
    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(&self.initiator_id, &self.room_id)
    }

    pub fn message(&self) -> Option<&PlatformMessage> {
        match &self.resource {
            EventResource::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn attachment_action(&self) -> Option<&AttachmentAction> {
        match &self.resource {
            EventResource::AttachmentAction(action) => Some(action),
            _ => None,
        }
    }

    /// Plain text of a message event, `None` for every other resource.
    pub fn text(&self) -> Option<&str> {
        self.message().map(|m| m.text.as_str())
    }
}

/// Conversation identity: one person in one room.
///
/// Format: `person:{person_id}:room:{room_id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub person_id: String,
    pub room_id: String,
}

impl SessionKey {
    pub fn new(person_id: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            person_id: person_id.into(),
            room_id: room_id.into(),
        }
    }

    pub fn format(&self) -> String {
        format!("person:{}:room:{}", self.person_id, self.room_id)
    }

    /// Parse `person:<id>:room:<id>` back into a key. The room id may
    /// itself contain colons; the person id may not.
    pub fn parse(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix("person:")
            .ok_or_else(|| ParleyError::InvalidKey(format!("missing 'person:' prefix: {s}")))?;

        let room_marker = ":room:";
        let room_pos = rest
            .find(room_marker)
            .ok_or_else(|| ParleyError::InvalidKey(format!("missing ':room:' segment: {s}")))?;

        let person_id = &rest[..room_pos];
        let room_id = &rest[room_pos + room_marker.len()..];

        if person_id.is_empty() {
            return Err(ParleyError::InvalidKey(format!(
                "person id must not be empty: {s}"
            )));
        }

        Ok(Self::new(person_id, room_id))
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_roundtrip() {
        let key = SessionKey::new("p-1", "r-1");
        assert_eq!(key.format(), "person:p-1:room:r-1");
        assert_eq!(SessionKey::parse(&key.format()).unwrap(), key);
    }

    #[test]
    fn session_key_room_with_colons() {
        let parsed = SessionKey::parse("person:p-1:room:a:b:c").unwrap();
        assert_eq!(parsed.room_id, "a:b:c");
    }

    #[test]
    fn session_key_rejects_missing_parts() {
        assert!(SessionKey::parse("room:r-1").is_err());
        assert!(SessionKey::parse("person:p-1").is_err());
        assert!(SessionKey::parse("person::room:r-1").is_err());
    }

    #[test]
    fn decodes_platform_message() {
        let json = r#"{
            "id": "m-1",
            "roomId": "r-1",
            "roomType": "direct",
            "text": "hello",
            "personId": "p-1",
            "personEmail": "p@example.com",
            "created": "2024-01-01T10:00:00.000Z"
        }"#;
        let message: PlatformMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.room_type, Some(RoomType::Direct));
        assert_eq!(message.person_email, "p@example.com");
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn decodes_attachment_action_and_unknown_kinds() {
        let json = r#"{
            "id": "a-1",
            "type": "submit",
            "messageId": "m-1",
            "personId": "p-1",
            "roomId": "r-1",
            "inputs": {"data": "yes"}
        }"#;
        let action: AttachmentAction = serde_json::from_str(json).unwrap();
        assert!(action.is_submit());
        assert_eq!(action.inputs["data"], "yes");

        let kind: ResourceKind = serde_json::from_str(r#""telephonyCalls""#).unwrap();
        assert_eq!(kind, ResourceKind::Unknown);
    }

    #[test]
    fn event_accessors() {
        let event = Event {
            initiator_id: "p-1".into(),
            initiator_email: String::new(),
            room_id: "r-1".into(),
            room_type: None,
            resource_kind: ResourceKind::Rooms,
            resource_event: ResourceEvent::Created,
            resource: EventResource::Other,
        };
        assert_eq!(event.session_key(), SessionKey::new("p-1", "r-1"));
        assert!(event.text().is_none());
        assert!(event.attachment_action().is_none());
    }
}
