pub mod card;
pub mod channel;
pub mod error;
pub mod types;

pub use card::{AdaptiveCardRenderer, CardRenderer, ADAPTIVE_CARD_CONTENT_TYPE};
pub use channel::Channel;
pub use error::ChannelError;
pub use types::{ChoiceMessage, ChoiceOption, File, Message, OutboundMessage, Recipient, TextFormat};
