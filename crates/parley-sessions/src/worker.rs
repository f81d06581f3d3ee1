use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use parley_core::SessionKey;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::DialogError;
use crate::messenger::Messenger;
use crate::task::DialogTask;
use crate::types::{CompletionSignal, SessionId};

/// Everything one session worker owns.
pub(crate) struct Worker {
    pub key: SessionKey,
    pub session_id: SessionId,
    pub task: Arc<dyn DialogTask>,
    pub messenger: Messenger,
    pub cancel: CancellationToken,
    pub completions: mpsc::Sender<CompletionSignal>,
}

impl Worker {
    /// Run the task to the end and report back.
    ///
    /// A worker whose session was stopped from the outside sends nothing:
    /// the router already dropped its registry entry.
    pub async fn run(mut self) {
        let outcome = match AssertUnwindSafe(self.task.talk(&mut self.messenger))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(payload) => Err(DialogError::Panicked(panic_message(payload.as_ref()))),
        };

        if self.cancel.is_cancelled() {
            debug!(session = %self.key, id = %self.session_id, "session stopped from outside, no completion signal");
            return;
        }
        self.cancel.cancel();

        let signal = CompletionSignal {
            key: self.key,
            session_id: self.session_id,
            outcome,
        };
        if self.completions.send(signal).await.is_err() {
            debug!("router gone, completion signal dropped");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
