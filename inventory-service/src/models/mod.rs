use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Catalog entry. `(vendor_id, lower(sku))` is unique; the currency is
/// always RUB.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub currency_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 1:1 stock row. Counters never go negative: every mutation carries its
/// feasibility predicate in the WHERE clause.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Stock {
    pub product_id: Uuid,
    pub available: i32,
    pub reserved: i32,
    pub updated_at: DateTime<Utc>,
}

/// Reservation lifecycle: PENDING → RESERVED or FAILED, RESERVED → RELEASED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "reservation_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Pending,
    Reserved,
    Released,
    Failed,
}

/// Per-(order, product) record; the pair is the idempotency key.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reservation {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}
