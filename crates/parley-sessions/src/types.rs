use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parley_core::{Event, SessionKey};
use serde::Serialize;
use uuid::Uuid;

use crate::error::DialogError;

/// Identity of one registry entry. A key that is preempted and started
/// again gets a new id, so signals from the old worker can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        // UUIDv7: time-sortable, handy when correlating logs
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a dialog task knows about the conversation it runs in.
#[derive(Debug, Clone)]
pub struct DialogInfo {
    pub person_id: String,
    pub room_id: String,
    /// The event that triggered this session. It is also the first event
    /// `listen` receives.
    pub initial_event: Event,
}

impl DialogInfo {
    pub fn key(&self) -> SessionKey {
        SessionKey::new(&self.person_id, &self.room_id)
    }
}

/// Sent by a worker when its task returns on its own.
#[derive(Debug)]
pub(crate) struct CompletionSignal {
    pub key: SessionKey,
    pub session_id: SessionId,
    pub outcome: Result<(), DialogError>,
}

/// Why [`SessionRouter::run`](crate::SessionRouter::run) returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown token was cancelled.
    Cancelled,
    /// The event source closed; no more events can arrive.
    SourceClosed,
}

/// Router counters. Written only by the router loop, readable anywhere.
#[derive(Debug, Default)]
pub struct RouterStats {
    active: AtomicUsize,
    started: AtomicU64,
    preempted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    delivered: AtomicU64,
    dropped_timeout: AtomicU64,
    dropped_unaddressed: AtomicU64,
}

/// Point-in-time copy of [`RouterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub active: usize,
    pub started: u64,
    pub preempted: u64,
    pub completed: u64,
    pub failed: u64,
    pub delivered: u64,
    pub dropped_timeout: u64,
    pub dropped_unaddressed: u64,
}

impl RouterStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            active: self.active.load(Ordering::Relaxed),
            started: self.started.load(Ordering::Relaxed),
            preempted: self.preempted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_timeout: self.dropped_timeout.load(Ordering::Relaxed),
            dropped_unaddressed: self.dropped_unaddressed.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn set_active(&self, n: usize) {
        self.active.store(n, Ordering::Relaxed);
    }

    pub(crate) fn session_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn session_preempted(&self) {
        self.preempted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn session_completed(&self, failed: bool) {
        if failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.completed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn event_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn event_timed_out(&self) {
        self.dropped_timeout.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn event_unaddressed(&self) {
        self.dropped_unaddressed.fetch_add(1, Ordering::Relaxed);
    }
}
