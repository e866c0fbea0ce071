mod config;
mod consumer;
mod sender;
mod templates;

use anyhow::{Context, Result};
use config::Settings;
use consumer::EmailConsumer;
use sender::EmailSender;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "notification_worker=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("starting notification worker");

    let settings = Settings::load().context("failed to load configuration")?;

    let sender = EmailSender::new(&settings.smtp).context("failed to initialize email sender")?;
    let consumer = EmailConsumer::new(&settings.kafka, sender)
        .context("failed to initialize email consumer")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(async move { consumer.run(shutdown_rx).await });

    shutdown_signal().await;
    shutdown_tx.send(true).ok();
    worker.await.ok();

    info!("notification worker shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }

    info!("shutting down gracefully");
}
