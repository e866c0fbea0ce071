use crate::db::product_repo::{ProductListFilter, ProductPatch};
use crate::error::Result;
use crate::middleware::jwt_auth::AuthUser;
use crate::models::Product;
use crate::services::ProductInput;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub vendor_id: Option<Uuid>,
    pub q: Option<String>,
    pub only_active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub products: Vec<Product>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub currency_code: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct BatchGetRequest {
    pub ids: Vec<Uuid>,
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let product = state.inventory.create_product(&actor, input).await?;
    Ok(Json(product))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>> {
    let product = state.inventory.get_product(product_id).await?;
    Ok(Json(product))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let filter = ProductListFilter {
        vendor_id: query.vendor_id,
        query: query.q,
        only_active: query.only_active,
        limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset: query.offset.unwrap_or(0).max(0),
    };
    let (products, total) = state.inventory.list_products(filter).await?;
    Ok(Json(ListResponse { products, total }))
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    let patch = ProductPatch {
        sku: req.sku,
        name: req.name,
        description: req.description,
        price_cents: req.price_cents,
        currency_code: req.currency_code,
        is_active: req.is_active,
    };
    let product = state.inventory.update_product(&actor, product_id, patch).await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let deleted = state.inventory.delete_product(&actor, product_id).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

pub async fn batch_get_products(
    State(state): State<AppState>,
    Json(req): Json<BatchGetRequest>,
) -> Result<Json<Vec<Product>>> {
    let products = state.inventory.batch_get_products(&req.ids).await?;
    Ok(Json(products))
}
