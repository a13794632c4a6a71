use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use sentinel_bot::broadcaster::AlertBroadcaster;
use sentinel_bot::config;
use sentinel_bot::metric;
use sentinel_bot::poller::RiskPoller;
use sentinel_bot::registry::SubscriberRegistry;
use sentinel_bot::risk_client::{HttpRiskClient, RiskSource};
use sentinel_bot::telegram::{
    log_startup_diagnostics, run_command_loop, CommandHandler, MessageTransport,
    TelegramTransport,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging: stderr plus a daily-rolling file
    let log_dir = Path::new("logs");
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "sentinel-bot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::Layer::new().with_writer(std::io::stderr).with_ansi(true))
        .with(
            fmt::Layer::new()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE),
        )
        .init();

    info!("starting Prophet Sentinel bot...");
    metric::describe_metrics();

    let config = config::init_config();
    info!("risk backend: {}", config.api_base);

    // Engine state: the registry is the only shared mutable resource,
    // injected into the command handlers, the poller and the broadcaster.
    let registry = Arc::new(SubscriberRegistry::new());
    let risk_client: Arc<dyn RiskSource> = Arc::new(HttpRiskClient::from_config(&config)?);

    let transport = Arc::new(TelegramTransport::new(&config)?);

    // A transport startup failure is logged with guidance but is not
    // fatal: a transient network problem should not prevent recovery.
    match transport.probe().await {
        Ok(identity) => info!(
            "bot online as @{} ({})",
            identity.username.unwrap_or_default(),
            identity.id
        ),
        Err(e) => log_startup_diagnostics(&e),
    }

    let broadcaster = Arc::new(AlertBroadcaster::new(
        Arc::clone(&config),
        Arc::clone(&registry),
        Arc::clone(&transport) as Arc<dyn MessageTransport>,
    ));

    // Timer-driven risk poller
    let poller = Arc::new(RiskPoller::new(
        Arc::clone(&config),
        Arc::clone(&registry),
        Arc::clone(&risk_client),
        broadcaster,
    ));
    let poller_handle = tokio::spawn({
        let poller = Arc::clone(&poller);
        async move { poller.run().await }
    });

    // Command surface (getUpdates long poll)
    let handler = Arc::new(CommandHandler::new(
        Arc::clone(&config),
        Arc::clone(&registry),
        Arc::clone(&risk_client),
    ));
    let command_handle = tokio::spawn(run_command_loop(Arc::clone(&transport), handler));

    info!("sentinel bot started, waiting for messages");

    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received, stopping services..."),
        Err(e) => error!("failed to listen for ctrl-c: {}", e),
    }

    poller_handle.abort();
    command_handle.abort();

    info!("sentinel bot stopped");
    Ok(())
}
