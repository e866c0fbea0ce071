use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub kafka: KafkaSettings,
    pub smtp: SmtpSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenv::dotenv().ok();
        }

        Ok(Settings {
            kafka: KafkaSettings::from_env()?,
            smtp: SmtpSettings::from_env()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct KafkaSettings {
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
}

impl KafkaSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            brokers: env::var("KAFKA_BROKERS").context("KAFKA_BROKERS must be set")?,
            group_id: env::var("KAFKA_GROUP_ID")
                .unwrap_or_else(|_| "notification-worker".to_string()),
            topic: env::var("KAFKA_EMAIL_TOPIC")
                .unwrap_or_else(|_| event_schema::TOPIC_EMAIL.to_string()),
        })
    }
}

/// With an empty `SMTP_HOST` the sender runs in no-op mode and only logs;
/// handy for development without mail infrastructure.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub use_starttls: bool,
}

impl SmtpSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SMTP_HOST").unwrap_or_default(),
            port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "465".to_string())
                .parse()
                .context("Invalid SMTP_PORT")?,
            username: env::var("SMTP_USERNAME").ok(),
            password: env::var("SMTP_PASSWORD").ok(),
            from: env::var("SMTP_FROM").unwrap_or_else(|_| "OrderHub <no-reply@orderhub.dev>".to_string()),
            use_starttls: env::var("SMTP_STARTTLS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}
