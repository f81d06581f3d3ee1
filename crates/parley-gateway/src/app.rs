use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use parley_core::Event;
use parley_sessions::RouterStats;
use tokio::sync::mpsc;

use crate::http::webhooks::ResourceSource;

/// Decides whether an event goes to the session router. All filters must
/// pass.
pub type EventFilter = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// How long a webhook request may wait for room in the router queue.
pub const ENQUEUE_DEADLINE: Duration = Duration::from_secs(1);

/// Shared state of the webhook server, passed as `Arc<AppState>` to handlers.
pub struct AppState {
    /// HMAC-SHA1 key; requests are not authenticated when `None`.
    pub secret: Option<String>,
    pub resources: Arc<dyn ResourceSource>,
    pub filters: Vec<EventFilter>,
    pub events: mpsc::Sender<Event>,
    pub enqueue_deadline: Duration,
    pub stats: Arc<RouterStats>,
}

impl AppState {
    pub fn matches_filters(&self, event: &Event) -> bool {
        self.filters.iter().all(|filter| filter(event))
    }
}

/// Filter dropping events the bot caused itself.
pub fn not_authored_by(bot_id: impl Into<String>) -> EventFilter {
    let bot_id = bot_id.into();
    Arc::new(move |event: &Event| event.initiator_id != bot_id)
}

/// Assemble the Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/webhooks", post(crate::http::webhooks::webhook_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
