//! Webex REST API client.
//!
//! Covers the handful of endpoints a conversational bot needs: posting and
//! reading messages, reading card submissions, registering webhooks, and
//! looking up the bot's own identity.

pub mod channel;
pub mod client;
pub mod error;
pub mod types;

pub use client::WebexClient;
pub use error::WebexError;
pub use types::{CreateMessageRequest, CreateWebhookRequest, Person, Webhook, WebhookCallback};
