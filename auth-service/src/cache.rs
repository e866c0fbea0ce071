//! Redis-backed caches: public JWK parameters by `kid` and the access-token
//! blacklist by `jti`.
//!
//! Every operation is best-effort. A miss or a redis failure falls back to
//! the persistent store (JWKs) or to "not blacklisted" (tokens); callers are
//! never surfaced a cache error.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::warn;

/// Cached public-key parameters live for 24 hours.
pub const JWK_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
pub struct TokenCache {
    conn: ConnectionManager,
}

impl TokenCache {
    pub async fn connect(url: &str) -> redis::RedisResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    pub async fn set_jwk(&self, kid: &str, payload: &str, ttl: Duration) {
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> = conn
            .set_ex(format!("jwk:{kid}"), payload, ttl.as_secs())
            .await;
        if let Err(err) = result {
            warn!(kid, error = %err, "failed to cache JWK");
        }
    }

    pub async fn get_jwk(&self, kid: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<Option<String>> = conn.get(format!("jwk:{kid}")).await;
        match result {
            Ok(value) => value,
            Err(err) => {
                warn!(kid, error = %err, "JWK cache read failed");
                None
            }
        }
    }

    pub async fn blacklist(&self, jti: &str, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> = conn
            .set_ex(format!("blacklist:{jti}"), "1", ttl.as_secs())
            .await;
        if let Err(err) = result {
            warn!(jti, error = %err, "failed to blacklist token");
        }
    }

    pub async fn is_blacklisted(&self, jti: &str) -> bool {
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<bool> = conn.exists(format!("blacklist:{jti}")).await;
        match result {
            Ok(found) => found,
            Err(err) => {
                warn!(jti, error = %err, "blacklist check failed");
                false
            }
        }
    }
}
