use std::sync::Arc;

use parley_channels::CardRenderer;
use parley_core::ParleyConfig;
use parley_sessions::{DialogTaskProvider, MessengerFactory, SessionRouter};
use parley_webex::WebexClient;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::{self, AppState, EventFilter, ENQUEUE_DEADLINE};
use crate::error::GatewayError;
use crate::registration::{register_webhooks, WEBHOOK_PATH};

/// Collects what a [`Bot`] needs and validates it.
pub struct BotBuilder {
    config: ParleyConfig,
    provider: Option<Arc<dyn DialogTaskProvider>>,
    filters: Vec<EventFilter>,
    renderer: Option<Arc<dyn CardRenderer>>,
}

impl BotBuilder {
    pub fn new(config: ParleyConfig) -> Self {
        Self {
            config,
            provider: None,
            filters: Vec::new(),
            renderer: None,
        }
    }

    pub fn provider(mut self, provider: impl DialogTaskProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Add an event filter. Events failing any filter are acknowledged and
    /// skipped.
    pub fn filter(mut self, filter: impl Fn(&parley_core::Event) -> bool + Send + Sync + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn CardRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn build(self) -> Result<Bot, GatewayError> {
        self.config.validate()?;
        let provider = self.provider.ok_or(GatewayError::MissingProvider)?;
        let client = WebexClient::from_config(&self.config.webex)?;

        Ok(Bot {
            config: self.config,
            client,
            provider,
            filters: self.filters,
            renderer: self.renderer,
        })
    }
}

/// A configured bot, ready to serve webhooks and run sessions.
pub struct Bot {
    config: ParleyConfig,
    client: WebexClient,
    provider: Arc<dyn DialogTaskProvider>,
    filters: Vec<EventFilter>,
    renderer: Option<Arc<dyn CardRenderer>>,
}

impl Bot {
    /// Serve webhooks and run the session router until `shutdown` is
    /// cancelled (`Ok`) or the server fails (the failure is returned).
    pub async fn listen_and_talk(self, shutdown: CancellationToken) -> Result<(), GatewayError> {
        let me = self.client.get_my_own_details().await?;
        info!(bot_id = %me.id, name = %me.display_name, "bot identity resolved");

        let mut filters = vec![app::not_authored_by(me.id)];
        filters.extend(self.filters);

        let addr = format!("{}:{}", self.config.webhook.bind, self.config.webhook.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(%addr, "webhook server listening");

        if self.config.webhook.register {
            let target = self.config.webhook.target_url(WEBHOOK_PATH);
            register_webhooks(&self.client, &target, self.config.webhook.secret.as_deref()).await?;
        }

        let (events_tx, events_rx) = mpsc::channel(self.config.router.event_queue);
        let mut factory = MessengerFactory::new(Arc::new(self.client.clone()));
        if let Some(renderer) = self.renderer {
            factory = factory.with_renderer(renderer);
        }
        let router = SessionRouter::new(events_rx, self.provider, factory, &self.config.router);

        let state = Arc::new(AppState {
            secret: self.config.webhook.secret.clone().filter(|s| !s.is_empty()),
            resources: Arc::new(self.client),
            filters,
            events: events_tx,
            enqueue_deadline: ENQUEUE_DEADLINE,
            stats: router.stats(),
        });

        let router_shutdown = shutdown.child_token();
        let router_task = tokio::spawn(router.run(router_shutdown.clone()));

        let server_shutdown = shutdown.clone();
        let served = axum::serve(listener, app::build_router(state))
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await;

        // the router never outlives the server
        router_shutdown.cancel();
        let routed = router_task.await;

        if let Err(e) = served {
            warn!(error = %e, "webhook server failed");
            return Err(GatewayError::Server(e));
        }
        match routed {
            Ok(reason) => {
                info!(?reason, "bot stopped");
                Ok(())
            }
            Err(e) => Err(GatewayError::Router(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::config::{RouterConfig, Scheme, WebexConfig, WebhookConfig};
    use parley_sessions::CompositeProvider;

    fn config(token: &str) -> ParleyConfig {
        ParleyConfig {
            webex: WebexConfig {
                token: token.into(),
                base_url: "http://127.0.0.1:9/v1".into(),
                request_timeout_secs: 1,
            },
            webhook: WebhookConfig {
                hostname: "bot.example.com".into(),
                port: 8080,
                bind: "127.0.0.1".into(),
                secret: None,
                scheme: Scheme::Http,
                register: false,
            },
            router: RouterConfig::default(),
        }
    }

    #[test]
    fn provider_is_required() {
        let err = BotBuilder::new(config("tok")).build().err().unwrap();
        assert!(matches!(err, GatewayError::MissingProvider));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = BotBuilder::new(config(""))
            .provider(CompositeProvider::new())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn builds_with_provider_and_filters() {
        let bot = BotBuilder::new(config("tok"))
            .provider(CompositeProvider::new())
            .filter(|event| event.room_type.is_some())
            .build()
            .unwrap();
        assert_eq!(bot.filters.len(), 1);
    }
}
