use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Device-bound container over one or more refresh lineages.
///
/// Revoked when its last active refresh row is revoked, or explicitly on
/// mass logout / password reset.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub revoked: bool,
}
