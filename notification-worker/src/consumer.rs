use crate::config::KafkaSettings;
use crate::sender::EmailSender;
use anyhow::{Context, Result};
use event_schema::EmailMessage;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Email-topic consumer. A bad payload or a failed dispatch is logged and
/// skipped; delivery is best-effort and the loop never dies on one message.
pub struct EmailConsumer {
    consumer: StreamConsumer,
    sender: EmailSender,
}

impl EmailConsumer {
    pub fn new(config: &KafkaSettings, sender: EmailSender) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "30000")
            .create()
            .context("failed to create kafka consumer")?;

        consumer
            .subscribe(&[&config.topic])
            .context("failed to subscribe to email topic")?;

        info!(brokers = %config.brokers, topic = %config.topic, "email consumer subscribed");

        Ok(Self { consumer, sender })
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("email consumer stopping");
                    break;
                }
                received = self.consumer.recv() => match received {
                    Ok(message) => self.handle(&message).await,
                    Err(err) => {
                        error!(error = %err, "kafka receive failed");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }

    async fn handle(&self, message: &BorrowedMessage<'_>) {
        let Some(payload) = message.payload() else {
            warn!("skipping message without payload");
            return;
        };

        let email = match serde_json::from_slice::<EmailMessage>(payload) {
            Ok(email) => email,
            Err(err) => {
                warn!(error = %err, "skipping malformed email message");
                return;
            }
        };

        if let Err(err) = self.sender.send(&email).await {
            error!(to = %email.to, template = %email.template, error = %err, "email dispatch failed");
        }
    }
}
