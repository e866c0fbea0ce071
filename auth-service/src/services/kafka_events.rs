use crate::error::{AuthError, Result};
use event_schema::{EmailMessage, TEMPLATE_PASSWORD_RESET, TEMPLATE_VERIFY_EMAIL};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::info;

/// Publishes [`EmailMessage`] payloads to the email topic.
///
/// Delivery is best-effort: callers log failures and carry on, auth
/// operations never fail because a notification could not be published.
#[derive(Clone)]
pub struct EmailProducer {
    producer: FutureProducer,
    topic: String,
}

impl EmailProducer {
    pub fn new(brokers: &str, topic: &str) -> Result<Self> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", "auth-service")
            .set("acks", "all")
            .set("message.timeout.ms", "5000")
            .create::<FutureProducer>()
            .map_err(|e| AuthError::Internal(format!("failed to create kafka producer: {e}")))?;

        info!(brokers, topic, "email producer initialized");

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }

    pub async fn send(&self, key: &str, message: &EmailMessage) -> Result<()> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| AuthError::Internal(format!("failed to encode email message: {e}")))?;

        self.producer
            .send(
                FutureRecord::to(&self.topic).key(key).payload(&payload),
                Timeout::After(Duration::from_secs(5)),
            )
            .await
            .map_err(|(err, _)| AuthError::Internal(format!("kafka publish failed: {err}")))?;

        Ok(())
    }

    pub async fn send_verification_code(&self, email: &str, code: &str) -> Result<()> {
        let message = EmailMessage::new(email, "Confirm your OrderHub email", TEMPLATE_VERIFY_EMAIL)
            .with_data("email", email)
            .with_data("code", code);
        self.send(email, &message).await
    }

    pub async fn send_password_reset_code(&self, email: &str, code: &str) -> Result<()> {
        let message = EmailMessage::new(email, "OrderHub password reset", TEMPLATE_PASSWORD_RESET)
            .with_data("email", email)
            .with_data("code", code);
        self.send(email, &message).await
    }
}
