use crate::error::Result;
use crate::models::Product;
use sqlx::{PgExecutor, PgPool, QueryBuilder};
use uuid::Uuid;

const COLUMNS: &str = "id, vendor_id, sku, name, description, price_cents, currency_code, is_active, created_at, updated_at";

pub struct NewProduct<'a> {
    pub vendor_id: Uuid,
    pub sku: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub price_cents: i64,
    pub currency_code: &'a str,
    pub is_active: bool,
}

#[derive(Debug, Default)]
pub struct ProductPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub currency_code: Option<String>,
    pub is_active: Option<bool>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.price_cents.is_none()
            && self.currency_code.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Default)]
pub struct ProductListFilter {
    pub vendor_id: Option<Uuid>,
    pub query: Option<String>,
    pub only_active: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

pub async fn create(exec: impl PgExecutor<'_>, product: &NewProduct<'_>) -> Result<Product> {
    let created = sqlx::query_as::<_, Product>(&format!(
        r#"
        INSERT INTO products (id, vendor_id, sku, name, description, price_cents, currency_code, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {COLUMNS}
        "#,
    ))
    .bind(Uuid::new_v4())
    .bind(product.vendor_id)
    .bind(product.sku)
    .bind(product.name)
    .bind(product.description)
    .bind(product.price_cents)
    .bind(product.currency_code)
    .bind(product.is_active)
    .fetch_one(exec)
    .await?;

    Ok(created)
}

pub async fn get_by_id(exec: impl PgExecutor<'_>, id: Uuid) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {COLUMNS} FROM products WHERE id = $1",
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?;

    Ok(product)
}

/// SKU comparison is case-insensitive per vendor.
pub async fn get_by_vendor_and_sku(
    exec: impl PgExecutor<'_>,
    vendor_id: Uuid,
    sku: &str,
) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {COLUMNS} FROM products WHERE vendor_id = $1 AND lower(sku) = lower($2)",
    ))
    .bind(vendor_id)
    .bind(sku)
    .fetch_optional(exec)
    .await?;

    Ok(product)
}

pub async fn list(pool: &PgPool, filter: &ProductListFilter) -> Result<(Vec<Product>, i64)> {
    let mut query = QueryBuilder::new(format!("SELECT {COLUMNS} FROM products WHERE 1=1"));
    push_filters(&mut query, filter);
    query.push(" ORDER BY created_at DESC LIMIT ");
    query.push_bind(filter.limit.max(1));
    query.push(" OFFSET ");
    query.push_bind(filter.offset.max(0));

    let products = query.build_query_as::<Product>().fetch_all(pool).await?;

    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM products WHERE 1=1");
    push_filters(&mut count_query, filter);
    let total: i64 = count_query
        .build_query_scalar()
        .fetch_one(pool)
        .await?;

    Ok((products, total))
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, sqlx::Postgres>, filter: &'a ProductListFilter) {
    if let Some(vendor_id) = filter.vendor_id {
        query.push(" AND vendor_id = ");
        query.push_bind(vendor_id);
    }
    if let Some(text) = &filter.query {
        if !text.is_empty() {
            let pattern = format!("%{text}%");
            query.push(" AND (name ILIKE ");
            query.push_bind(pattern.clone());
            query.push(" OR sku ILIKE ");
            query.push_bind(pattern);
            query.push(")");
        }
    }
    if filter.only_active == Some(true) {
        query.push(" AND is_active = true");
    }
}

pub async fn update_fields(
    exec: impl PgExecutor<'_>,
    id: Uuid,
    patch: &ProductPatch,
) -> Result<bool> {
    if patch.is_empty() {
        return Ok(false);
    }

    let mut query = QueryBuilder::new("UPDATE products SET updated_at = now()");
    if let Some(sku) = &patch.sku {
        query.push(", sku = ");
        query.push_bind(sku);
    }
    if let Some(name) = &patch.name {
        query.push(", name = ");
        query.push_bind(name);
    }
    if let Some(description) = &patch.description {
        query.push(", description = ");
        query.push_bind(description);
    }
    if let Some(price_cents) = patch.price_cents {
        query.push(", price_cents = ");
        query.push_bind(price_cents);
    }
    if let Some(currency_code) = &patch.currency_code {
        query.push(", currency_code = ");
        query.push_bind(currency_code);
    }
    if let Some(is_active) = patch.is_active {
        query.push(", is_active = ");
        query.push_bind(is_active);
    }
    query.push(" WHERE id = ");
    query.push_bind(id);

    let result = query.build().execute(exec).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(exec: impl PgExecutor<'_>, id: Uuid) -> Result<bool> {
    // Reservations reference products with ON DELETE RESTRICT; surface that
    // as the domain kind instead of a bare database error.
    match sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(exec)
        .await
    {
        Ok(result) => Ok(result.rows_affected() > 0),
        Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23503") => {
            Err(crate::error::InventoryError::CannotDeleteReserved)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn batch_get(exec: impl PgExecutor<'_>, ids: &[Uuid]) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {COLUMNS} FROM products WHERE id = ANY($1)",
    ))
    .bind(ids)
    .fetch_all(exec)
    .await?;

    Ok(products)
}
