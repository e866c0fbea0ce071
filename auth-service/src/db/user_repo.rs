use crate::error::Result;
use crate::models::User;
use sqlx::PgExecutor;
use uuid::Uuid;

pub async fn create(
    exec: impl PgExecutor<'_>,
    id: Uuid,
    email: &str,
    password_hash: &str,
    role: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash, role, is_email_verified)
        VALUES ($1, $2, $3, $4, false)
        RETURNING id, email, password_hash, role, is_email_verified, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(exec)
    .await?;

    Ok(user)
}

pub async fn exists_by_email(exec: impl PgExecutor<'_>, email: &str) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE lower(email) = lower($1)",
    )
    .bind(email)
    .fetch_one(exec)
    .await?;

    Ok(count > 0)
}

pub async fn get_by_email(exec: impl PgExecutor<'_>, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, role, is_email_verified, created_at, updated_at
        FROM users
        WHERE lower(email) = lower($1)
        "#,
    )
    .bind(email)
    .fetch_optional(exec)
    .await?;

    Ok(user)
}

pub async fn get_by_id(exec: impl PgExecutor<'_>, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, role, is_email_verified, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;

    Ok(user)
}

pub async fn update_password(exec: impl PgExecutor<'_>, id: Uuid, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
        .bind(password_hash)
        .bind(id)
        .execute(exec)
        .await?;

    Ok(())
}

pub async fn set_email_verified(exec: impl PgExecutor<'_>, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE users SET is_email_verified = true, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(exec)
        .await?;

    Ok(())
}
