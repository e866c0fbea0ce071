use anyhow::{Context, Result};
use auth_service::cache::TokenCache;
use auth_service::config::Settings;
use auth_service::db::jwk_repo::PgJwkStore;
use auth_service::routes;
use auth_service::security::keys::KeyProvider;
use auth_service::security::password::PasswordHasher;
use auth_service::security::tokens::TokenProvider;
use auth_service::services::{spawn_cleanup_tasks, AuthService, EmailProducer};
use auth_service::AppState;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "auth_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("starting auth service");

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

    let cache = match &settings.redis.url {
        Some(url) => match TokenCache::connect(url).await {
            Ok(cache) => {
                info!("redis cache initialized");
                Some(cache)
            }
            Err(err) => {
                warn!(error = %err, "redis unavailable; JWK cache and blacklist disabled");
                None
            }
        },
        None => {
            info!("redis not configured; JWK cache and blacklist disabled");
            None
        }
    };

    let email_producer = match &settings.kafka.brokers {
        Some(brokers) => match EmailProducer::new(brokers, &settings.kafka.email_topic) {
            Ok(producer) => Some(producer),
            Err(err) => {
                warn!(error = %err, "kafka unavailable; notifications disabled");
                None
            }
        },
        None => {
            info!("kafka not configured; notifications disabled");
            None
        }
    };

    let keys = Arc::new(KeyProvider::new(
        Arc::new(PgJwkStore::new(db_pool.clone())),
        cache.clone(),
    ));
    // Creating the first signing key must succeed before we serve traffic.
    let kid = keys
        .ensure_active()
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to ensure active signing key")?;
    info!(%kid, "active signing key ready");

    let tokens = Arc::new(TokenProvider::new(
        keys,
        cache,
        settings.jwt.issuer.clone(),
        settings.jwt.audience.clone(),
    ));

    let auth = Arc::new(AuthService::new(
        db_pool.clone(),
        PasswordHasher::new(),
        tokens,
        email_producer,
        Duration::seconds(settings.jwt.access_ttl_secs as i64),
        Duration::seconds(settings.jwt.refresh_ttl_secs as i64),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let cleanup_handles = spawn_cleanup_tasks(db_pool, shutdown_rx);
    info!("cleanup scheduler started");

    let app = routes::router(AppState { auth });

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    shutdown_tx.send(true).ok();
    for handle in cleanup_handles {
        handle.await.ok();
    }

    info!("auth service shutdown complete");
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
