use crate::error::Result;
use crate::models::PasswordResetCode;
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, email, code_hash, expires_at, consumed, created_at";

pub async fn create(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
    email: &str,
    code_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO password_reset_tokens (id, user_id, email, code_hash, expires_at, consumed)
        VALUES ($1, $2, $3, $4, $5, false)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(email)
    .bind(code_hash)
    .bind(expires_at)
    .execute(exec)
    .await?;

    Ok(id)
}

/// Most recently created code for the user, consumed or not. Drives the
/// 60-second cooldown check.
pub async fn find_latest_for_user(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
) -> Result<Option<PasswordResetCode>> {
    let row = sqlx::query_as::<_, PasswordResetCode>(&format!(
        "SELECT {COLUMNS} FROM password_reset_tokens WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
    ))
    .bind(user_id)
    .fetch_optional(exec)
    .await?;

    Ok(row)
}

pub async fn get_valid_by_hash(
    exec: impl PgExecutor<'_>,
    code_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<PasswordResetCode>> {
    let row = sqlx::query_as::<_, PasswordResetCode>(&format!(
        "SELECT {COLUMNS} FROM password_reset_tokens WHERE code_hash = $1 AND consumed = false AND expires_at > $2",
    ))
    .bind(code_hash)
    .bind(now)
    .fetch_optional(exec)
    .await?;

    Ok(row)
}

/// Conditional consume: returns whether this call was the effective
/// consumer. Applying it twice affects one row total.
pub async fn consume(exec: impl PgExecutor<'_>, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE password_reset_tokens SET consumed = true WHERE id = $1 AND consumed = false",
    )
    .bind(id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_all_for_user(exec: impl PgExecutor<'_>, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(exec)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_expired(exec: impl PgExecutor<'_>, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < $1")
        .bind(now)
        .execute(exec)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_consumed_before(exec: impl PgExecutor<'_>, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM password_reset_tokens WHERE consumed = true AND created_at < $1",
    )
    .bind(cutoff)
    .execute(exec)
    .await?;

    Ok(result.rows_affected())
}
