use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// One-shot email-verification code. Valid iff not consumed and not expired;
/// consumption is a conditional update with at-most-once effect.
#[derive(Debug, Clone, FromRow)]
pub struct EmailVerification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

/// One-shot password-reset code; same shape and rules as
/// [`EmailVerification`] but targets the password.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}
