use std::sync::Arc;

use parley_channels::{
    AdaptiveCardRenderer, CardRenderer, Channel, ChoiceMessage, Message, OutboundMessage, Recipient,
};
use parley_core::{Event, ResourceKind};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::DialogError;
use crate::types::DialogInfo;

/// What a listener decides about one inbound event.
#[derive(Debug)]
pub enum Turn<R> {
    /// Not interesting; keep waiting.
    Continue,
    /// Send this message back to the user, then keep waiting.
    Clarify(Message),
    /// Stop listening with a result.
    Done(R),
    /// Stop listening with an error.
    Fail(DialogError),
}

/// A dialog task's view of its conversation: the session's inbound events
/// and a way to reply.
pub struct Messenger {
    info: DialogInfo,
    recipient: Recipient,
    inbound: mpsc::Receiver<Event>,
    cancel: CancellationToken,
    channel: Arc<dyn Channel>,
    renderer: Arc<dyn CardRenderer>,
}

impl Messenger {
    pub fn dialog_info(&self) -> &DialogInfo {
        &self.info
    }

    /// Cancelled when the session is preempted or the router stops.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Send a message into the session's conversation. Returns the id the
    /// platform assigned to it.
    pub async fn send(&self, message: Message) -> Result<String, DialogError> {
        message.validate()?;
        let outbound = OutboundMessage {
            recipient: self.recipient.clone(),
            message,
        };
        Ok(self.channel.send(&outbound).await?)
    }

    /// Feed inbound events to `listener` until it finishes the turn.
    ///
    /// Ends with [`DialogError::Cancelled`] as soon as the session is
    /// stopped, whatever the listener would have said.
    pub async fn listen<R, F>(&mut self, mut listener: F) -> Result<R, DialogError>
    where
        F: FnMut(&Event) -> Turn<R>,
    {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(DialogError::Cancelled),
                event = self.inbound.recv() => match event {
                    Some(event) => event,
                    None => return Err(DialogError::Cancelled),
                },
            };

            match listener(&event) {
                Turn::Continue => {}
                Turn::Clarify(message) => {
                    self.send(message).await?;
                }
                Turn::Done(result) => return Ok(result),
                Turn::Fail(err) => return Err(err),
            }
        }
    }

    /// Present `choice` as a card and wait for the user to pick one of its
    /// options. Returns the chosen option id.
    ///
    /// Submissions naming an option this prompt does not offer (an older
    /// card, say) are ignored. A submission that cannot be decoded fails
    /// with [`DialogError::Protocol`].
    pub async fn offer_choice(&mut self, choice: ChoiceMessage) -> Result<String, DialogError> {
        choice.validate()?;
        let card = self.renderer.render_choice(&choice.text, &choice.options)?;

        let mut message = Message::markdown(choice.text.clone()).with_card(card);
        message.parent_id = choice.parent_id.clone();
        let message_id = self.send(message).await?;
        debug!(%message_id, options = choice.options.len(), "choice offered");

        self.listen(|event| choice_turn(event, &choice)).await
    }
}

#[derive(Deserialize)]
struct ChoiceInputs {
    data: String,
}

fn choice_turn(event: &Event, choice: &ChoiceMessage) -> Turn<String> {
    if event.resource_kind != ResourceKind::AttachmentActions {
        return Turn::Continue;
    }
    let Some(action) = event.attachment_action() else {
        return Turn::Continue;
    };
    if !action.is_submit() {
        return Turn::Continue;
    }

    match serde_json::from_value::<ChoiceInputs>(action.inputs.clone()) {
        Ok(inputs) if choice.offers(&inputs.data) => Turn::Done(inputs.data),
        Ok(inputs) => {
            debug!(option = %inputs.data, "submission for an option not offered, ignoring");
            Turn::Continue
        }
        Err(e) => Turn::Fail(DialogError::Protocol(format!(
            "unable to decode the submitted choice: {e}"
        ))),
    }
}

/// Builds the [`Messenger`] for each new session.
#[derive(Clone)]
pub struct MessengerFactory {
    channel: Arc<dyn Channel>,
    renderer: Arc<dyn CardRenderer>,
}

impl MessengerFactory {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self {
            channel,
            renderer: Arc::new(AdaptiveCardRenderer),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn CardRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// A messenger bound to the conversation of `initial_event`.
    pub fn provide(
        &self,
        initial_event: Event,
        inbound: mpsc::Receiver<Event>,
        cancel: CancellationToken,
    ) -> Messenger {
        let key = initial_event.session_key();
        Messenger {
            recipient: Recipient::from(&key),
            info: DialogInfo {
                person_id: key.person_id,
                room_id: key.room_id,
                initial_event,
            },
            inbound,
            cancel,
            channel: Arc::clone(&self.channel),
            renderer: Arc::clone(&self.renderer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::{AttachmentAction, AttachmentActionType, EventResource, ResourceEvent};
    use serde_json::json;

    fn submit(inputs: serde_json::Value) -> Event {
        Event {
            initiator_id: "p-1".into(),
            initiator_email: String::new(),
            room_id: "r-1".into(),
            room_type: None,
            resource_kind: ResourceKind::AttachmentActions,
            resource_event: ResourceEvent::Created,
            resource: EventResource::AttachmentAction(AttachmentAction {
                id: "a-1".into(),
                person_id: "p-1".into(),
                room_id: "r-1".into(),
                action_type: AttachmentActionType::Submit,
                message_id: "m-1".into(),
                inputs,
                created: None,
            }),
        }
    }

    fn yes_no() -> ChoiceMessage {
        ChoiceMessage::new(
            "Coffee?",
            vec![
                parley_channels::ChoiceOption::new("yes", "Yes"),
                parley_channels::ChoiceOption::new("no", "No"),
            ],
        )
    }

    #[test]
    fn offered_option_finishes_the_turn() {
        match choice_turn(&submit(json!({"data": "yes"})), &yes_no()) {
            Turn::Done(id) => assert_eq!(id, "yes"),
            other => panic!("unexpected turn: {other:?}"),
        }
    }

    #[test]
    fn unknown_option_is_ignored() {
        assert!(matches!(
            choice_turn(&submit(json!({"data": "maybe"})), &yes_no()),
            Turn::Continue
        ));
    }

    #[test]
    fn undecodable_inputs_fail_with_protocol_error() {
        assert!(matches!(
            choice_turn(&submit(json!({"other": 1})), &yes_no()),
            Turn::Fail(DialogError::Protocol(_))
        ));
    }

    #[test]
    fn non_submit_actions_are_ignored() {
        let mut event = submit(json!({"data": "yes"}));
        if let EventResource::AttachmentAction(action) = &mut event.resource {
            action.action_type = AttachmentActionType::Unknown;
        }
        assert!(matches!(choice_turn(&event, &yes_no()), Turn::Continue));
    }
}
