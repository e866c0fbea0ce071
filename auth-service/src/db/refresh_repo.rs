use crate::error::Result;
use crate::models::RefreshToken;
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

pub struct NewRefreshToken<'a> {
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    pub token_hash: &'a str,
    pub client_id: Option<&'a str>,
    pub ip: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub expires_at: DateTime<Utc>,
}

pub async fn create(exec: impl PgExecutor<'_>, token: &NewRefreshToken<'_>) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, session_id, token_hash, client_id, ip, user_agent, expires_at, revoked)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, false)
        "#,
    )
    .bind(id)
    .bind(token.user_id)
    .bind(token.session_id)
    .bind(token.token_hash)
    .bind(token.client_id)
    .bind(token.ip)
    .bind(token.user_agent)
    .bind(token.expires_at)
    .execute(exec)
    .await?;

    Ok(id)
}

/// An unrevoked, unexpired row exists for this fingerprint.
pub async fn is_active_by_hash(
    exec: impl PgExecutor<'_>,
    hash: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM refresh_tokens WHERE token_hash = $1 AND revoked = false AND expires_at > $2",
    )
    .bind(hash)
    .bind(now)
    .fetch_one(exec)
    .await?;

    Ok(count > 0)
}

pub async fn get_unrevoked_by_hash(
    exec: impl PgExecutor<'_>,
    hash: &str,
) -> Result<Option<RefreshToken>> {
    let token = sqlx::query_as::<_, RefreshToken>(
        r#"
        SELECT id, user_id, session_id, token_hash, client_id, ip, user_agent,
               expires_at, revoked, created_at, last_used_at
        FROM refresh_tokens
        WHERE token_hash = $1 AND revoked = false
        "#,
    )
    .bind(hash)
    .fetch_optional(exec)
    .await?;

    Ok(token)
}

/// Revoke the unrevoked row with this fingerprint. Returns whether this call
/// was the effective revoker, which makes revocation monotonic under races.
pub async fn revoke_by_hash(exec: impl PgExecutor<'_>, hash: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked = true, last_used_at = now() WHERE token_hash = $1 AND revoked = false",
    )
    .bind(hash)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn revoke_all_for_user(exec: impl PgExecutor<'_>, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked = true WHERE user_id = $1 AND revoked = false",
    )
    .bind(user_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected())
}

pub async fn has_active_for_session(
    exec: impl PgExecutor<'_>,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM refresh_tokens WHERE session_id = $1 AND revoked = false AND expires_at > $2",
    )
    .bind(session_id)
    .bind(now)
    .fetch_one(exec)
    .await?;

    Ok(count > 0)
}

pub async fn delete_expired(exec: impl PgExecutor<'_>, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
        .bind(now)
        .execute(exec)
        .await?;

    Ok(result.rows_affected())
}
