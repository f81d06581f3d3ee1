use std::sync::Arc;

use async_trait::async_trait;
use parley_core::{Event, ResourceKind};

use crate::error::DialogError;
use crate::messenger::Messenger;

/// A unit of conversational behavior: one run of a dialog with one user.
///
/// `talk` returns when the dialog is over. Returning `Ok(())` or an error
/// both end the session; a panic is caught and reported as
/// [`DialogError::Panicked`].
#[async_trait]
pub trait DialogTask: Send + Sync {
    async fn talk(&self, messenger: &mut Messenger) -> Result<(), DialogError>;
}

/// Decides whether an event starts a new session.
///
/// Returning `Some` for an event whose conversation already has a live
/// session preempts that session.
pub trait DialogTaskProvider: Send + Sync {
    fn provide_for(&self, event: &Event) -> Option<Arc<dyn DialogTask>>;
}

impl<F> DialogTaskProvider for F
where
    F: Fn(&Event) -> Option<Arc<dyn DialogTask>> + Send + Sync,
{
    fn provide_for(&self, event: &Event) -> Option<Arc<dyn DialogTask>> {
        self(event)
    }
}

/// Asks each provider in order; the first task offered wins.
#[derive(Default)]
pub struct CompositeProvider {
    providers: Vec<Box<dyn DialogTaskProvider>>,
}

impl CompositeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl DialogTaskProvider + 'static) -> Self {
        self.push(provider);
        self
    }

    pub fn push(&mut self, provider: impl DialogTaskProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl DialogTaskProvider for CompositeProvider {
    fn provide_for(&self, event: &Event) -> Option<Arc<dyn DialogTask>> {
        self.providers.iter().find_map(|p| p.provide_for(event))
    }
}

/// Starts a task when a message's text is exactly `command`, or begins
/// with `command` followed by whitespace. Case-insensitive.
pub struct CommandProvider {
    command: String,
    task: Arc<dyn DialogTask>,
}

impl CommandProvider {
    pub fn new(command: impl Into<String>, task: Arc<dyn DialogTask>) -> Self {
        Self {
            command: command.into(),
            task,
        }
    }

    fn matches(&self, text: &str) -> bool {
        let text = text.trim();
        let Some(head) = text.get(..self.command.len()) else {
            return false;
        };
        head.eq_ignore_ascii_case(&self.command)
            && text[self.command.len()..]
                .chars()
                .next()
                .map_or(true, char::is_whitespace)
    }
}

impl DialogTaskProvider for CommandProvider {
    fn provide_for(&self, event: &Event) -> Option<Arc<dyn DialogTask>> {
        if event.resource_kind != ResourceKind::Messages {
            return None;
        }
        event
            .text()
            .filter(|text| self.matches(text))
            .map(|_| Arc::clone(&self.task))
    }
}
