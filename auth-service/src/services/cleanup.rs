//! Periodic removal of expired and consumed rows.
//!
//! Three independent tasks run alongside request handling and stop
//! cooperatively at the next tick once the shutdown channel fires. A failed
//! sweep is logged and the task keeps ticking; it never takes the process
//! down.

use crate::db::{email_verification_repo, password_reset_repo, refresh_repo, session_repo};
use crate::error::Result;
use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

const EXPIRED_SWEEP_PERIOD: Duration = Duration::from_secs(30 * 60);
const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60 * 60);
const CONSUMED_SWEEP_PERIOD: Duration = Duration::from_secs(6 * 60 * 60);

const SESSION_IDLE_DAYS: i64 = 30;
const CONSUMED_RETENTION_HOURS: i64 = 24;

#[derive(Clone)]
pub struct CleanupService {
    db: PgPool,
}

impl CleanupService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Delete refresh, password-reset and email-verification rows whose
    /// expiry has passed.
    pub async fn cleanup_expired_rows(&self) -> Result<()> {
        let now = Utc::now();

        let refresh = refresh_repo::delete_expired(&self.db, now).await?;
        if refresh > 0 {
            info!(count = refresh, "deleted expired refresh tokens");
        }

        let resets = password_reset_repo::delete_expired(&self.db, now).await?;
        if resets > 0 {
            info!(count = resets, "deleted expired password reset codes");
        }

        let verifications = email_verification_repo::delete_expired(&self.db, now).await?;
        if verifications > 0 {
            info!(count = verifications, "deleted expired email verification codes");
        }

        Ok(())
    }

    /// Delete sessions without an active refresh row, then sessions idle for
    /// longer than 30 days.
    pub async fn cleanup_sessions(&self) -> Result<()> {
        let now = Utc::now();

        let orphaned = session_repo::delete_orphaned(&self.db, now).await?;
        if orphaned > 0 {
            info!(count = orphaned, "deleted orphaned sessions");
        }

        let idle = session_repo::delete_idle_since(
            &self.db,
            now - ChronoDuration::days(SESSION_IDLE_DAYS),
        )
        .await?;
        if idle > 0 {
            info!(count = idle, "deleted idle sessions");
        }

        Ok(())
    }

    /// Delete consumed one-shot codes older than 24 hours.
    pub async fn cleanup_consumed_codes(&self) -> Result<()> {
        let cutoff = Utc::now() - ChronoDuration::hours(CONSUMED_RETENTION_HOURS);

        let resets = password_reset_repo::delete_consumed_before(&self.db, cutoff).await?;
        if resets > 0 {
            info!(count = resets, "deleted consumed password reset codes");
        }

        let verifications =
            email_verification_repo::delete_consumed_before(&self.db, cutoff).await?;
        if verifications > 0 {
            info!(count = verifications, "deleted consumed email verification codes");
        }

        Ok(())
    }
}

/// Launch the three cleanup tasks. The expired-rows sweep runs immediately
/// on start; the other two wait for their first full period.
pub fn spawn_cleanup_tasks(db: PgPool, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    let expired = {
        let service = CleanupService::new(db.clone());
        let mut shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(EXPIRED_SWEEP_PERIOD);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = service.cleanup_expired_rows().await {
                            error!(error = %err, "expired-rows cleanup failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("expired-rows cleanup stopped");
                        break;
                    }
                }
            }
        })
    };

    let sessions = {
        let service = CleanupService::new(db.clone());
        let mut shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SESSION_SWEEP_PERIOD);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = service.cleanup_sessions().await {
                            error!(error = %err, "session cleanup failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("session cleanup stopped");
                        break;
                    }
                }
            }
        })
    };

    let consumed = {
        let service = CleanupService::new(db);
        let mut shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CONSUMED_SWEEP_PERIOD);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = service.cleanup_consumed_codes().await {
                            error!(error = %err, "consumed-codes cleanup failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("consumed-codes cleanup stopped");
                        break;
                    }
                }
            }
        })
    };

    vec![expired, sessions, consumed]
}
