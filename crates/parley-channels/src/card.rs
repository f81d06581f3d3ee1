//! Choice prompt rendering.
//!
//! A choice prompt is one message whose Adaptive Card holds a text block and
//! one `Action.Submit` button per option. Pressing a button submits
//! `{"data": "<option id>"}`, which the session messenger correlates back to
//! the offered options.

use serde_json::{json, Value};

use crate::{error::ChannelError, types::ChoiceOption};

/// Content type of an Adaptive Card attachment.
pub const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";

const ADAPTIVE_CARD_SCHEMA: &str = "http://adaptivecards.io/schemas/adaptive-card.json";
const ADAPTIVE_CARD_VERSION: &str = "1.3";

/// Turns a prompt and its options into an opaque card payload.
pub trait CardRenderer: Send + Sync {
    fn render_choice(&self, text: &str, options: &[ChoiceOption]) -> Result<Value, ChannelError>;
}

/// Renders choice prompts as Adaptive Cards 1.3.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveCardRenderer;

impl CardRenderer for AdaptiveCardRenderer {
    fn render_choice(&self, text: &str, options: &[ChoiceOption]) -> Result<Value, ChannelError> {
        if options.is_empty() {
            return Err(ChannelError::Render("no options to render".into()));
        }

        let actions: Vec<Value> = options
            .iter()
            .map(|option| {
                json!({
                    "type": "Action.Submit",
                    "title": option.label,
                    "data": { "data": option.id },
                })
            })
            .collect();

        Ok(json!({
            "type": "AdaptiveCard",
            "$schema": ADAPTIVE_CARD_SCHEMA,
            "version": ADAPTIVE_CARD_VERSION,
            "body": [
                { "type": "TextBlock", "text": text, "wrap": true },
                { "type": "ActionSet", "actions": actions },
            ],
        }))
    }
}
