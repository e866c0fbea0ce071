use crate::error::Result;
use crate::models::{Reservation, ReservationStatus};
use sqlx::PgExecutor;
use uuid::Uuid;

const COLUMNS: &str = "id, order_id, product_id, quantity, status, created_at";

/// Upsert the PENDING record keyed on `(order_id, product_id)`.
pub async fn upsert_pending(
    exec: impl PgExecutor<'_>,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO reservations (id, order_id, product_id, quantity, status)
        VALUES ($1, $2, $3, $4, 'PENDING')
        ON CONFLICT (order_id, product_id)
        DO UPDATE SET quantity = EXCLUDED.quantity, status = 'PENDING'
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .execute(exec)
    .await?;

    Ok(())
}

pub async fn set_status(
    exec: impl PgExecutor<'_>,
    order_id: Uuid,
    product_id: Uuid,
    status: ReservationStatus,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE reservations SET status = $1 WHERE order_id = $2 AND product_id = $3",
    )
    .bind(status)
    .bind(order_id)
    .bind(product_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_by_order(exec: impl PgExecutor<'_>, order_id: Uuid) -> Result<Vec<Reservation>> {
    let rows = sqlx::query_as::<_, Reservation>(&format!(
        "SELECT {COLUMNS} FROM reservations WHERE order_id = $1 ORDER BY created_at",
    ))
    .bind(order_id)
    .fetch_all(exec)
    .await?;

    Ok(rows)
}

pub async fn exists_for_order(exec: impl PgExecutor<'_>, order_id: Uuid) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM reservations WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_one(exec)
    .await?;

    Ok(count > 0)
}
