use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Opaque refresh-token record. Only the SHA-256 fingerprint of the opaque
/// secret is stored; the secret itself never touches the database.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    pub token_hash: String,
    pub client_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}
