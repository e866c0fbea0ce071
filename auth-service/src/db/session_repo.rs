use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

pub async fn create(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
    client_id: &str,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO user_sessions (id, user_id, client_id, ip, user_agent, revoked)
        VALUES ($1, $2, $3, $4, $5, false)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(client_id)
    .bind(ip)
    .bind(user_agent)
    .execute(exec)
    .await?;

    Ok(id)
}

pub async fn touch(exec: impl PgExecutor<'_>, id: Uuid, at: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE user_sessions SET last_seen_at = $1 WHERE id = $2")
        .bind(at)
        .bind(id)
        .execute(exec)
        .await?;

    Ok(())
}

pub async fn revoke(exec: impl PgExecutor<'_>, id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE user_sessions SET revoked = true WHERE id = $1 AND revoked = false")
        .bind(id)
        .execute(exec)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn revoke_all_for_user(exec: impl PgExecutor<'_>, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE user_sessions SET revoked = true WHERE user_id = $1 AND revoked = false",
    )
    .bind(user_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected())
}

/// Delete sessions that no longer have any active refresh row.
pub async fn delete_orphaned(exec: impl PgExecutor<'_>, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM user_sessions
        WHERE id NOT IN (
            SELECT DISTINCT session_id
            FROM refresh_tokens
            WHERE session_id IS NOT NULL
              AND revoked = false
              AND expires_at > $1
        )
        "#,
    )
    .bind(now)
    .execute(exec)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_idle_since(exec: impl PgExecutor<'_>, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM user_sessions WHERE last_seen_at < $1")
        .bind(cutoff)
        .execute(exec)
        .await?;

    Ok(result.rows_affected())
}
