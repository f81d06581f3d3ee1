use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};

pub const DEFAULT_WEBEX_URL: &str = "https://webexapis.com/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PUSH_TIMEOUT_MS: u64 = 10; // per-event delivery budget into one session
pub const DEFAULT_SESSION_BUFFER: usize = 8;
pub const DEFAULT_EVENT_QUEUE: usize = 3; // webhook server -> router

/// Top-level config (parley.toml + PARLEY_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParleyConfig {
    pub webex: WebexConfig,
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebexConfig {
    /// Bot access token.
    pub token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Public host name the platform calls back to.
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// HMAC-SHA1 key shared with the platform. No signature check when unset.
    pub secret: Option<String>,
    #[serde(default)]
    pub scheme: Scheme,
    /// Register the message and attachment-action webhooks on start.
    #[serde(default = "bool_true")]
    pub register: bool,
}

/// Scheme used in the registered webhook target URL. TLS itself is
/// terminated in front of the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_push_timeout_ms")]
    pub push_timeout_ms: u64,
    #[serde(default = "default_session_buffer")]
    pub session_buffer: usize,
    #[serde(default = "default_event_queue")]
    pub event_queue: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            push_timeout_ms: DEFAULT_PUSH_TIMEOUT_MS,
            session_buffer: DEFAULT_SESSION_BUFFER,
            event_queue: DEFAULT_EVENT_QUEUE,
        }
    }
}

impl RouterConfig {
    pub fn push_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.push_timeout_ms)
    }
}

impl WebhookConfig {
    /// `{scheme}://{hostname}:{port}{path}` as registered with the platform.
    pub fn target_url(&self, path: &str) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme.as_str(),
            self.hostname,
            self.port,
            path
        )
    }
}

fn default_base_url() -> String {
    DEFAULT_WEBEX_URL.to_string()
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_push_timeout_ms() -> u64 {
    DEFAULT_PUSH_TIMEOUT_MS
}
fn default_session_buffer() -> usize {
    DEFAULT_SESSION_BUFFER
}
fn default_event_queue() -> usize {
    DEFAULT_EVENT_QUEUE
}
fn bool_true() -> bool {
    true
}

impl ParleyConfig {
    /// Load config from a TOML file with PARLEY_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.parley/parley.toml
    ///
    /// Nested keys are separated by a double underscore in env vars,
    /// e.g. `PARLEY_WEBEX__TOKEN`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("PARLEY_").split("__")),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: ParleyConfig = figment
            .extract()
            .map_err(|e| ParleyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the gateway cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.webex.token.trim().is_empty() {
            return Err(ParleyError::Config("webex token must be specified".into()));
        }
        if self.webhook.hostname.trim().is_empty() {
            return Err(ParleyError::Config("webhook host name must be specified".into()));
        }
        if self.webhook.port == 0 {
            return Err(ParleyError::Config("webhook port must not be zero".into()));
        }
        if self.router.push_timeout_ms == 0 {
            return Err(ParleyError::Config("router push timeout must not be zero".into()));
        }
        if self.router.session_buffer == 0 || self.router.event_queue == 0 {
            return Err(ParleyError::Config("router buffers must not be zero".into()));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.parley/parley.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn loads_toml_with_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "parley.toml",
                r#"
                [webex]
                token = "secret-token"

                [webhook]
                hostname = "bot.example.com"
                "#,
            )?;

            let config = ParleyConfig::load(Some("parley.toml")).expect("config");
            assert_eq!(config.webex.base_url, DEFAULT_WEBEX_URL);
            assert_eq!(config.webhook.port, DEFAULT_PORT);
            assert!(config.webhook.register);
            assert_eq!(config.router.push_timeout_ms, DEFAULT_PUSH_TIMEOUT_MS);
            assert_eq!(
                config.webhook.target_url("/webhooks"),
                "http://bot.example.com:8080/webhooks"
            );
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "parley.toml",
                r#"
                [webex]
                token = "from-file"

                [webhook]
                hostname = "bot.example.com"
                "#,
            )?;
            jail.set_env("PARLEY_WEBEX__TOKEN", "from-env");
            jail.set_env("PARLEY_ROUTER__PUSH_TIMEOUT_MS", "25");

            let config = ParleyConfig::load(Some("parley.toml")).expect("config");
            assert_eq!(config.webex.token, "from-env");
            assert_eq!(config.router.push_timeout_ms, 25);
            Ok(())
        });
    }

    #[test]
    fn rejects_empty_token() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "parley.toml",
                r#"
                [webex]
                token = ""

                [webhook]
                hostname = "bot.example.com"
                "#,
            )?;

            let err = ParleyConfig::load(Some("parley.toml")).unwrap_err();
            assert_eq!(err.code(), "CONFIG_ERROR");
            assert!(err.to_string().contains("token"));
            Ok(())
        });
    }
}
