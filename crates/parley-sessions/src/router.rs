use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parley_core::config::RouterConfig;
use parley_core::{Event, SessionKey};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::messenger::MessengerFactory;
use crate::task::{DialogTask, DialogTaskProvider};
use crate::types::{CompletionSignal, RouterStats, SessionId, StopReason};
use crate::worker::Worker;

const COMPLETION_BUFFER: usize = 64;

/// One live session in the registry.
struct SessionEntry {
    id: SessionId,
    cancel: CancellationToken,
    /// Taken (and so closed) when the session is stopped.
    inbound: Option<mpsc::Sender<Event>>,
}

impl SessionEntry {
    /// Cancel the worker and close its inbound channel. Returns `false`
    /// when the worker had already finished on its own.
    fn stop(&mut self) -> bool {
        let was_running = !self.cancel.is_cancelled();
        self.cancel.cancel();
        self.inbound.take();
        was_running
    }
}

/// Routes events to per-conversation sessions.
///
/// A single loop owns the registry: it starts sessions for trigger events
/// (the trigger is also the first event in the new session's inbox),
/// preempts the live session of the same conversation, forwards other
/// events with a bounded wait, and removes sessions whose task finished.
/// Nothing else touches the registry, so no locking is needed.
pub struct SessionRouter {
    events: mpsc::Receiver<Event>,
    provider: Arc<dyn DialogTaskProvider>,
    factory: MessengerFactory,
    push_timeout: Duration,
    session_buffer: usize,
    sessions: HashMap<SessionKey, SessionEntry>,
    completion_tx: mpsc::Sender<CompletionSignal>,
    completion_rx: mpsc::Receiver<CompletionSignal>,
    stats: Arc<RouterStats>,
}

impl SessionRouter {
    pub fn new(
        events: mpsc::Receiver<Event>,
        provider: Arc<dyn DialogTaskProvider>,
        factory: MessengerFactory,
        config: &RouterConfig,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_BUFFER);
        Self {
            events,
            provider,
            factory,
            push_timeout: config.push_timeout(),
            session_buffer: config.session_buffer.max(1),
            sessions: HashMap::new(),
            completion_tx,
            completion_rx,
            stats: Arc::new(RouterStats::default()),
        }
    }

    /// Shared counters, readable while the router runs.
    pub fn stats(&self) -> Arc<RouterStats> {
        Arc::clone(&self.stats)
    }

    /// Run until `shutdown` is cancelled or the event source closes. Every
    /// live session is stopped on the way out.
    pub async fn run(mut self, shutdown: CancellationToken) -> StopReason {
        info!(
            push_timeout_ms = self.push_timeout.as_millis() as u64,
            session_buffer = self.session_buffer,
            "session router started"
        );

        let reason = loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break StopReason::Cancelled,
                Some(signal) = self.completion_rx.recv() => self.complete(signal),
                event = self.events.recv() => match event {
                    Some(event) => self.dispatch(event, &shutdown).await,
                    None => break StopReason::SourceClosed,
                },
            }
        };

        self.stop_all();
        info!(?reason, "session router stopped");
        reason
    }

    async fn dispatch(&mut self, event: Event, shutdown: &CancellationToken) {
        let key = event.session_key();

        if let Some(task) = self.provider.provide_for(&event) {
            if let Some(mut old) = self.sessions.remove(&key) {
                if old.stop() {
                    self.stats.session_preempted();
                    info!(session = %key, id = %old.id, "session preempted");
                }
            }
            self.start(key.clone(), event.clone(), task, shutdown);
            // the new session's first listen sees its own trigger
            if let Some(entry) = self.sessions.get(&key) {
                self.push(&key, entry, event).await;
            }
            return;
        }

        match self.sessions.get(&key) {
            Some(entry) => self.push(&key, entry, event).await,
            None => {
                self.stats.event_unaddressed();
                debug!(session = %key, kind = %event.resource_kind, "no session for event, dropped");
            }
        }
    }

    #[instrument(skip(self, event, task, shutdown), fields(session = %key))]
    fn start(&mut self, key: SessionKey, event: Event, task: Arc<dyn DialogTask>, shutdown: &CancellationToken) {
        let id = SessionId::new();
        let cancel = shutdown.child_token();
        let (tx, rx) = mpsc::channel(self.session_buffer);

        let worker = Worker {
            key: key.clone(),
            session_id: id,
            task,
            messenger: self.factory.provide(event, rx, cancel.clone()),
            cancel: cancel.clone(),
            completions: self.completion_tx.clone(),
        };
        tokio::spawn(worker.run());

        self.sessions.insert(
            key.clone(),
            SessionEntry {
                id,
                cancel,
                inbound: Some(tx),
            },
        );
        self.stats.session_started();
        self.stats.set_active(self.sessions.len());
        info!(%id, "session started");
    }

    /// Hand `event` to a live session, giving up after the push timeout or
    /// once the session finishes.
    async fn push(&self, key: &SessionKey, entry: &SessionEntry, event: Event) {
        let Some(tx) = &entry.inbound else {
            return;
        };

        tokio::select! {
            biased;
            _ = entry.cancel.cancelled() => {
                debug!(session = %key, "session finishing, event not delivered");
            }
            sent = tx.send(event) => match sent {
                Ok(()) => self.stats.event_delivered(),
                Err(_) => debug!(session = %key, "session inbox closed, event not delivered"),
            },
            _ = tokio::time::sleep(self.push_timeout) => {
                self.stats.event_timed_out();
                warn!(
                    session = %key,
                    timeout_ms = self.push_timeout.as_millis() as u64,
                    "session did not accept event in time, dropped"
                );
            }
        }
    }

    #[instrument(skip(self, signal), fields(session = %signal.key, id = %signal.session_id))]
    fn complete(&mut self, signal: CompletionSignal) {
        let current = self
            .sessions
            .get(&signal.key)
            .is_some_and(|entry| entry.id == signal.session_id);
        if !current {
            debug!("stale completion signal ignored");
            return;
        }

        if let Some(mut entry) = self.sessions.remove(&signal.key) {
            entry.stop();
        }
        self.stats.set_active(self.sessions.len());

        match &signal.outcome {
            Ok(()) => {
                self.stats.session_completed(false);
                info!("session completed");
            }
            Err(e) => {
                self.stats.session_completed(true);
                error!(error = %e, "session ended with error");
            }
        }
    }

    fn stop_all(&mut self) {
        let n = self.sessions.len();
        for (_, mut entry) in self.sessions.drain() {
            entry.stop();
        }
        self.stats.set_active(0);
        if n > 0 {
            info!(sessions = n, "stopped live sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DialogError;
    use crate::task::CompositeProvider;
    use async_trait::async_trait;
    use parley_channels::{Channel, ChannelError, OutboundMessage};

    struct Silent;

    #[async_trait]
    impl Channel for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        async fn send(&self, _msg: &OutboundMessage) -> Result<String, ChannelError> {
            Ok("m-1".into())
        }
    }

    fn router() -> SessionRouter {
        let (_events, rx) = mpsc::channel(1);
        SessionRouter::new(
            rx,
            Arc::new(CompositeProvider::new()),
            MessengerFactory::new(Arc::new(Silent)),
            &RouterConfig::default(),
        )
    }

    /// Registers a live entry for `key` and returns its id and inbox.
    fn register(router: &mut SessionRouter, key: &SessionKey) -> (SessionId, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(1);
        let id = SessionId::new();
        router.sessions.insert(
            key.clone(),
            SessionEntry {
                id,
                cancel: CancellationToken::new(),
                inbound: Some(tx),
            },
        );
        (id, rx)
    }

    #[tokio::test]
    async fn stale_signal_leaves_current_session_alone() {
        let mut router = router();
        let key = SessionKey::new("alice", "r-1");
        let (id, inbox) = register(&mut router, &key);

        router.complete(CompletionSignal {
            key: key.clone(),
            session_id: SessionId::new(),
            outcome: Err(DialogError::Cancelled),
        });

        let entry = router.sessions.get(&key).unwrap();
        assert_eq!(entry.id, id);
        assert!(!entry.cancel.is_cancelled());
        assert!(entry.inbound.as_ref().is_some_and(|tx| !tx.is_closed()));
        drop(inbox);

        let s = router.stats().snapshot();
        assert_eq!(s.completed + s.failed, 0);
    }

    #[tokio::test]
    async fn matching_signal_removes_the_session() {
        let mut router = router();
        let key = SessionKey::new("alice", "r-1");
        let (id, mut inbox) = register(&mut router, &key);

        router.complete(CompletionSignal {
            key: key.clone(),
            session_id: id,
            outcome: Ok(()),
        });

        assert!(!router.sessions.contains_key(&key));
        assert!(inbox.recv().await.is_none());
        assert_eq!(router.stats().snapshot().completed, 1);
    }

    #[tokio::test]
    async fn stopping_closes_inbox_once_and_reports_running_state() {
        let (tx, mut rx) = mpsc::channel::<Event>(1);
        let mut entry = SessionEntry {
            id: SessionId::new(),
            cancel: CancellationToken::new(),
            inbound: Some(tx),
        };

        assert!(entry.stop());
        assert!(entry.cancel.is_cancelled());
        assert!(entry.inbound.is_none());
        assert!(rx.recv().await.is_none());

        // already stopped: idempotent, not counted as running
        assert!(!entry.stop());
    }
}
