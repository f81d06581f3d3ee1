//! Webhook gateway: receives Webex callbacks, feeds them to the session
//! router, and wires the whole bot together.

pub mod app;
pub mod bot;
pub mod demo;
pub mod error;
pub mod http;
pub mod registration;

pub use app::{not_authored_by, AppState, EventFilter};
pub use bot::{Bot, BotBuilder};
pub use error::GatewayError;
