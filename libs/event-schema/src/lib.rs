//! Event contracts shared across the OrderHub services.
//!
//! The auth service publishes [`EmailMessage`] payloads to the email topic,
//! the notification worker consumes them, and the order service publishes the
//! `order.*` events that drive the reservation saga. Everything on the wire
//! is JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Topic carrying [`EmailMessage`] payloads.
pub const TOPIC_EMAIL: &str = "notifications.email";
/// Topic carrying [`OrderCreatedEvent`] payloads.
pub const TOPIC_ORDER_CREATED: &str = "order.created";
/// Topic carrying [`OrderCancelledEvent`] payloads.
pub const TOPIC_ORDER_CANCELLED: &str = "order.cancelled";

/// Template rendered for email-verification codes.
pub const TEMPLATE_VERIFY_EMAIL: &str = "verify_email";
/// Template rendered for password-reset codes.
pub const TEMPLATE_PASSWORD_RESET: &str = "password_reset";

/// A single email to be rendered and dispatched by the notification worker.
///
/// `template` selects the body layout; `data` feeds its placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub template: String,
    #[serde(default)]
    pub data: HashMap<String, Value>,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            template: template.into(),
            data: HashMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// One line item inside [`OrderCreatedEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemEvent {
    pub product_id: Uuid,
    pub quantity: u32,
    pub price_cents: i64,
    pub currency: String,
    #[serde(rename = "line_total_cents")]
    pub line_total: i64,
}

/// Published by the order service after a successful reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItemEvent>,
    pub total_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Published by the order service when an order is cancelled, including
/// cancellation of an already confirmed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order_id: Uuid,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub cancelled_at: DateTime<Utc>,
}
