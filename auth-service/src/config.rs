//! Environment-driven configuration.
//!
//! Every section reads from env vars with development defaults where a value
//! is not security sensitive. `DATABASE_URL` is mandatory; redis and kafka
//! are optional and the service degrades gracefully without them (no JWK
//! cache / blacklist, no outbound notifications).

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub kafka: KafkaSettings,
    pub jwt: JwtSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenv::dotenv().ok();
        }

        Ok(Settings {
            server: ServerSettings::from_env()?,
            database: DatabaseSettings::from_env()?,
            redis: RedisSettings::from_env(),
            kafka: KafkaSettings::from_env(),
            jwt: JwtSettings::from_env()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8081".to_string())
                .parse()
                .context("Invalid SERVER_PORT")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,
        })
    }
}

/// Redis is optional: without it the JWK cache and token blacklist are off.
#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub url: Option<String>,
}

impl RedisSettings {
    fn from_env() -> Self {
        Self {
            url: env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Kafka is optional: without brokers, notification messages are dropped
/// with a log line instead of being published.
#[derive(Debug, Clone)]
pub struct KafkaSettings {
    pub brokers: Option<String>,
    pub email_topic: String,
}

impl KafkaSettings {
    fn from_env() -> Self {
        Self {
            brokers: env::var("KAFKA_BROKERS").ok().filter(|s| !s.trim().is_empty()),
            email_topic: env::var("KAFKA_EMAIL_TOPIC")
                .unwrap_or_else(|_| event_schema::TOPIC_EMAIL.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "orderhub-auth".to_string()),
            audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "orderhub".to_string()),
            access_ttl_secs: env::var("JWT_ACCESS_TTL_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .context("Invalid JWT_ACCESS_TTL_SECS")?,
            refresh_ttl_secs: env::var("JWT_REFRESH_TTL_SECS")
                .unwrap_or_else(|_| "2592000".to_string())
                .parse()
                .context("Invalid JWT_REFRESH_TTL_SECS")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_settings_use_defaults() {
        env::remove_var("JWT_ISSUER");
        env::remove_var("JWT_AUDIENCE");
        env::remove_var("JWT_ACCESS_TTL_SECS");
        env::remove_var("JWT_REFRESH_TTL_SECS");

        let settings = JwtSettings::from_env().unwrap();
        assert_eq!(settings.issuer, "orderhub-auth");
        assert_eq!(settings.audience, "orderhub");
        assert_eq!(settings.access_ttl_secs, 900);
        assert_eq!(settings.refresh_ttl_secs, 2_592_000);
    }

    #[test]
    fn kafka_settings_tolerate_missing_brokers() {
        env::remove_var("KAFKA_BROKERS");
        let settings = KafkaSettings::from_env();
        assert!(settings.brokers.is_none());
        assert_eq!(settings.email_topic, "notifications.email");
    }
}
