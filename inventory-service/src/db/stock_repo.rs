use crate::error::Result;
use crate::models::Stock;
use sqlx::PgExecutor;
use uuid::Uuid;

pub async fn get(exec: impl PgExecutor<'_>, product_id: Uuid) -> Result<Option<Stock>> {
    let stock = sqlx::query_as::<_, Stock>(
        "SELECT product_id, available, reserved, updated_at FROM inventories WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_optional(exec)
    .await?;

    Ok(stock)
}

/// Insert the 1:1 stock row for a new product if it does not exist yet.
pub async fn ensure_row(exec: impl PgExecutor<'_>, product_id: Uuid) -> Result<()> {
    sqlx::query("INSERT INTO inventories (product_id) VALUES ($1) ON CONFLICT (product_id) DO NOTHING")
        .bind(product_id)
        .execute(exec)
        .await?;

    Ok(())
}

pub async fn set_available(exec: impl PgExecutor<'_>, product_id: Uuid, available: i32) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE inventories SET available = $1, updated_at = now() WHERE product_id = $2",
    )
    .bind(available)
    .bind(product_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Atomic increment; refuses to take `available` below zero by predicating
/// on `available + delta >= 0`.
pub async fn adjust_available(exec: impl PgExecutor<'_>, product_id: Uuid, delta: i32) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE inventories
        SET available = available + $1,
            updated_at = now()
        WHERE product_id = $2
          AND available + $1 >= 0
        "#,
    )
    .bind(delta)
    .bind(product_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// `available -= qty, reserved += qty` iff `available >= qty`.
pub async fn try_reserve(exec: impl PgExecutor<'_>, product_id: Uuid, qty: i32) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE inventories
        SET available = available - $1,
            reserved  = reserved  + $1,
            updated_at = now()
        WHERE product_id = $2
          AND available >= $1
        "#,
    )
    .bind(qty)
    .bind(product_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// `reserved -= qty, available += qty` iff `reserved >= qty`.
pub async fn release(exec: impl PgExecutor<'_>, product_id: Uuid, qty: i32) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE inventories
        SET reserved  = reserved  - $1,
            available = available + $1,
            updated_at = now()
        WHERE product_id = $2
          AND reserved >= $1
        "#,
    )
    .bind(qty)
    .bind(product_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Final consumption: `reserved -= qty` without crediting `available`.
pub async fn confirm(exec: impl PgExecutor<'_>, product_id: Uuid, qty: i32) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE inventories
        SET reserved  = reserved - $1,
            updated_at = now()
        WHERE product_id = $2
          AND reserved >= $1
        "#,
    )
    .bind(qty)
    .bind(product_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}
