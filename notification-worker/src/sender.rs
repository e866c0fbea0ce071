use crate::config::SmtpSettings;
use crate::templates;
use anyhow::{Context, Result};
use event_schema::EmailMessage;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

/// Renders templates and dispatches over SMTP with TLS (implicit TLS by
/// default, STARTTLS when configured). Without an SMTP host it only logs.
pub struct EmailSender {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl EmailSender {
    pub fn new(config: &SmtpSettings) -> Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .context("invalid SMTP_FROM address")?;

        let transport = if config.host.trim().is_empty() {
            warn!("SMTP host not configured; emails will only be logged");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            }
            .context("failed to configure SMTP transport")?
            .port(config.port);

            let builder = match (&config.username, &config.password) {
                (Some(username), Some(password)) => {
                    builder.credentials(Credentials::new(username.clone(), password.clone()))
                }
                _ => builder,
            };

            Some(builder.build())
        };

        Ok(Self { transport, from })
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<()> {
        let rendered = templates::render(&message.template, &message.data)?;

        let Some(transport) = &self.transport else {
            info!(to = %message.to, template = %message.template, "no-op mode; email not dispatched");
            return Ok(());
        };

        let email = Message::builder()
            .from(self.from.clone())
            .to(message.to.parse::<Mailbox>().context("invalid recipient address")?)
            .subject(&message.subject)
            .multipart(MultiPart::alternative_plain_html(
                rendered.text,
                rendered.html,
            ))
            .context("failed to build email")?;

        transport.send(email).await.context("SMTP dispatch failed")?;
        info!(to = %message.to, template = %message.template, "email dispatched");
        Ok(())
    }
}
