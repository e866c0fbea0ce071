use anyhow::{Context, Result};
use inventory_service::config::Settings;
use inventory_service::routes;
use inventory_service::services::InventoryService;
use inventory_service::AppState;
use jwt_verify::JwksVerifier;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "inventory_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("starting inventory service");

    let settings = Settings::load().context("failed to load configuration")?;

    let db_pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&settings.database.url)
        .await
        .context("failed to connect to PostgreSQL")?;
    info!("database pool initialized");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("failed to run database migrations")?;
    info!("database migrations completed");

    let verifier = Arc::new(JwksVerifier::new(
        settings.auth.jwks_url.clone(),
        settings.auth.issuer.clone(),
        settings.auth.audience.clone(),
    ));
    // Warm the key cache; tokens can still validate later if auth is briefly
    // unreachable at startup.
    if let Err(err) = verifier.refresh().await {
        warn!(error = %err, "could not prefetch JWKS; will retry on first request");
    }

    let state = AppState {
        inventory: Arc::new(InventoryService::new(db_pool)),
        verifier,
    };

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("inventory service shutdown complete");
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
