use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use parley_core::ParleyConfig;
use parley_gateway::{demo, BotBuilder};

/// Conversational Webex bot.
#[derive(Debug, Parser)]
#[command(name = "parley", version)]
struct Cli {
    /// Path to the TOML config file (default: ~/.parley/parley.toml).
    #[arg(long, env = "PARLEY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "parley_gateway=info,parley_sessions=info,parley_webex=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = ParleyConfig::load(cli.config.as_deref()).inspect_err(|e| {
        error!(code = e.code(), error = %e, "unable to load configuration");
    })?;
    info!(
        hostname = %config.webhook.hostname,
        port = config.webhook.port,
        "configuration loaded"
    );

    let bot = BotBuilder::new(config).provider(demo::provider()).build()?;

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => warn!(error = %e, "unable to listen for Ctrl-C, shutting down"),
        }
        on_signal.cancel();
    });

    bot.listen_and_talk(shutdown).await?;
    info!("bye");
    Ok(())
}
