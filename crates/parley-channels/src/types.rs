use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Markup of the message text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Markdown,
    Html,
}

impl FromStr for TextFormat {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" => Ok(TextFormat::Markdown),
            "html" => Ok(TextFormat::Html),
            other => Err(ChannelError::InvalidMessage(format!(
                "unknown text format: {other}"
            ))),
        }
    }
}

/// A local file uploaded together with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub name: String,
    pub content: Vec<u8>,
}

impl File {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Content of one outbound message, built by dialog code.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    /// Rich text in `format`.
    pub text: String,
    pub format: TextFormat,
    /// Fallback for clients that cannot render `text`.
    pub plain_text: Option<String>,
    pub file: Option<File>,
    /// Adaptive Card body, sent as an attachment.
    pub card: Option<serde_json::Value>,
    /// Reply into this thread.
    pub parent_id: Option<String>,
}

impl Message {
    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Markdown,
            ..Self::default()
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Html,
            ..Self::default()
        }
    }

    pub fn with_plain_text(mut self, plain_text: impl Into<String>) -> Self {
        self.plain_text = Some(plain_text.into());
        self
    }

    pub fn with_file(mut self, file: File) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_card(mut self, card: serde_json::Value) -> Self {
        self.card = Some(card);
        self
    }

    pub fn in_thread(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Reject messages the platform would refuse, before any network call.
    pub fn validate(&self) -> Result<(), ChannelError> {
        if self.file.is_some() && self.card.is_some() {
            return Err(ChannelError::InvalidMessage(
                "a message cannot contain both a file and a card".into(),
            ));
        }

        let has_text = !self.text.is_empty()
            || self.plain_text.as_deref().is_some_and(|t| !t.is_empty());
        if !has_text && self.file.is_none() && self.card.is_none() {
            return Err(ChannelError::InvalidMessage("the message is empty".into()));
        }
        Ok(())
    }
}

/// One selectable answer of a [`ChoiceMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    /// Value returned when the user picks this option. Unique per message.
    pub id: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A prompt with an ordered set of options, rendered as an interactive card.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChoiceMessage {
    pub text: String,
    pub options: Vec<ChoiceOption>,
    pub parent_id: Option<String>,
}

impl ChoiceMessage {
    pub fn new(text: impl Into<String>, options: Vec<ChoiceOption>) -> Self {
        Self {
            text: text.into(),
            options,
            parent_id: None,
        }
    }

    pub fn in_thread(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ChannelError> {
        if self.options.is_empty() {
            return Err(ChannelError::InvalidMessage(
                "a choice message needs at least one option".into(),
            ));
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.id.as_str()) {
                return Err(ChannelError::InvalidMessage(format!(
                    "duplicate option id: {}",
                    option.id
                )));
            }
        }
        Ok(())
    }

    pub fn offers(&self, option_id: &str) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }
}

/// Who a message goes to: the person and room of one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Recipient {
    pub person_id: String,
    pub room_id: String,
}

impl From<&parley_core::SessionKey> for Recipient {
    fn from(key: &parley_core::SessionKey) -> Self {
        Self {
            person_id: key.person_id.clone(),
            room_id: key.room_id.clone(),
        }
    }
}

/// A message addressed to a recipient, ready for a [`Channel`](crate::Channel).
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub recipient: Recipient,
    pub message: Message,
}
