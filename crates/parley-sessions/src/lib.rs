//! Conversation sessions on top of an asynchronous event stream.
//!
//! The [`SessionRouter`] owns every live session, one per
//! (person, room) pair. Each session runs a [`DialogTask`] on its own Tokio
//! task and talks to the user through a [`Messenger`], which turns the
//! session's private event channel into blocking `listen` / `offer_choice`
//! calls.

pub mod error;
pub mod messenger;
pub mod router;
pub mod task;
pub mod types;
mod worker;

pub use error::DialogError;
pub use messenger::{Messenger, MessengerFactory, Turn};
pub use router::SessionRouter;
pub use task::{CommandProvider, CompositeProvider, DialogTask, DialogTaskProvider};
pub use types::{DialogInfo, RouterStats, SessionId, StatsSnapshot, StopReason};
