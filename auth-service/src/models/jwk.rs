use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Persisted signing-key material.
///
/// Retired rows are kept indefinitely so access tokens signed before a
/// rotation remain verifiable until they expire. At most one row is active.
#[derive(Debug, Clone, FromRow)]
pub struct JwkKey {
    pub kid: String,
    pub alg: String,
    pub kty: String,
    pub key_use: String,
    pub n: String,
    pub e: String,
    pub private_pem: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub rotates_at: Option<DateTime<Utc>>,
}
