//! Demo dialogs served by the `parley` binary.

use std::sync::Arc;

use async_trait::async_trait;
use parley_channels::{ChoiceMessage, ChoiceOption, Message};
use parley_core::ResourceKind;
use parley_sessions::{CommandProvider, CompositeProvider, DialogError, DialogTask, Messenger, Turn};

/// `/coffee`: offer a yes/no card and confirm the answer.
pub struct CoffeeDialog;

#[async_trait]
impl DialogTask for CoffeeDialog {
    async fn talk(&self, messenger: &mut Messenger) -> Result<(), DialogError> {
        let choice = ChoiceMessage::new(
            "Would you like a coffee?",
            vec![ChoiceOption::new("yes", "Yes, please"), ChoiceOption::new("no", "No, thanks")],
        );

        let reply = match messenger.offer_choice(choice).await?.as_str() {
            "yes" => "Great, one coffee coming up.",
            _ => "Alright, maybe next time.",
        };
        messenger.send(Message::markdown(reply)).await?;
        Ok(())
    }
}

/// `/echo [text]`: repeat the text, or ask for it and repeat the next message.
pub struct EchoDialog;

#[async_trait]
impl DialogTask for EchoDialog {
    async fn talk(&self, messenger: &mut Messenger) -> Result<(), DialogError> {
        let trigger = messenger.dialog_info().initial_event.clone();
        let inline = trigger
            .text()
            .and_then(|text| text.trim().split_once(char::is_whitespace))
            .map(|(_, rest)| rest.trim().to_string())
            .filter(|rest| !rest.is_empty());

        let text = match inline {
            Some(text) => text,
            None => {
                messenger
                    .send(Message::markdown("Send me something and I will repeat it."))
                    .await?;
                messenger
                    .listen(|event| {
                        if event == &trigger || event.resource_kind != ResourceKind::Messages {
                            return Turn::Continue;
                        }
                        match event.text().map(str::trim) {
                            Some("") | None => Turn::Clarify(Message::markdown("I can only repeat text.")),
                            Some(text) => Turn::Done(text.to_string()),
                        }
                    })
                    .await?
            }
        };

        messenger.send(Message::markdown(text)).await?;
        Ok(())
    }
}

/// Provider for the demo commands.
pub fn provider() -> CompositeProvider {
    CompositeProvider::new()
        .with(CommandProvider::new("/coffee", Arc::new(CoffeeDialog)))
        .with(CommandProvider::new("/echo", Arc::new(EchoDialog)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_channels::{Channel, ChannelError, OutboundMessage};
    use parley_core::types::{
        AttachmentAction, AttachmentActionType, EventResource, PlatformMessage, ResourceEvent,
    };
    use parley_core::Event;
    use parley_sessions::MessengerFactory;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl Channel for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn send(&self, msg: &OutboundMessage) -> Result<String, ChannelError> {
            let mut sent = self.0.lock().unwrap();
            sent.push(msg.message.text.clone());
            Ok(format!("m-{}", sent.len()))
        }
    }

    fn message(text: &str) -> Event {
        Event {
            initiator_id: "alice".into(),
            initiator_email: "alice@example.com".into(),
            room_id: "r-1".into(),
            room_type: None,
            resource_kind: ResourceKind::Messages,
            resource_event: ResourceEvent::Created,
            resource: EventResource::Message(PlatformMessage {
                id: format!("msg-{text}"),
                room_id: "r-1".into(),
                text: text.into(),
                person_id: "alice".into(),
                ..Default::default()
            }),
        }
    }

    fn submit(choice: &str) -> Event {
        Event {
            initiator_id: "alice".into(),
            initiator_email: String::new(),
            room_id: "r-1".into(),
            room_type: None,
            resource_kind: ResourceKind::AttachmentActions,
            resource_event: ResourceEvent::Created,
            resource: EventResource::AttachmentAction(AttachmentAction {
                id: format!("act-{choice}"),
                person_id: "alice".into(),
                room_id: "r-1".into(),
                action_type: AttachmentActionType::Submit,
                message_id: "m-1".into(),
                inputs: json!({"data": choice}),
                created: None,
            }),
        }
    }

    /// Runs `task` as the router would: the trigger first in the inbox,
    /// followed by `replies`. Returns the texts it sent.
    async fn converse(task: &dyn DialogTask, trigger: Event, replies: Vec<Event>) -> Vec<String> {
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = mpsc::channel(replies.len() + 1);
        tx.send(trigger.clone()).await.unwrap();
        for reply in replies {
            tx.send(reply).await.unwrap();
        }

        let mut messenger = MessengerFactory::new(recorder.clone()).provide(trigger, rx, CancellationToken::new());
        task.talk(&mut messenger).await.unwrap();
        let sent = recorder.0.lock().unwrap().clone();
        sent
    }

    #[tokio::test]
    async fn coffee_confirms_the_chosen_option() {
        let sent = converse(&CoffeeDialog, message("/coffee"), vec![message("hmm"), submit("yes")]).await;
        assert_eq!(sent, vec!["Would you like a coffee?", "Great, one coffee coming up."]);

        let sent = converse(&CoffeeDialog, message("/coffee"), vec![submit("no")]).await;
        assert_eq!(sent[1], "Alright, maybe next time.");
    }

    #[tokio::test]
    async fn echo_repeats_inline_text() {
        let sent = converse(&EchoDialog, message("/echo  hello there "), vec![]).await;
        assert_eq!(sent, vec!["hello there"]);
    }

    #[tokio::test]
    async fn echo_skips_its_trigger_and_repeats_the_next_message() {
        let sent = converse(&EchoDialog, message("/echo"), vec![message("   "), message("again")]).await;
        assert_eq!(
            sent,
            vec![
                "Send me something and I will repeat it.",
                "I can only repeat text.",
                "again",
            ]
        );
    }
}
