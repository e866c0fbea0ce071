use crate::error::Result;
use crate::middleware::jwt_auth::AuthUser;
use crate::models::Stock;
use crate::AppState;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub available: i32,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i32,
}

pub async fn get_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Stock>> {
    let stock = state.inventory.get_stock(product_id).await?;
    Ok(Json(stock))
}

pub async fn set_stock(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<SetStockRequest>,
) -> Result<Json<Stock>> {
    let stock = state
        .inventory
        .set_stock(&actor, product_id, req.available)
        .await?;
    Ok(Json(stock))
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<AdjustStockRequest>,
) -> Result<Json<Stock>> {
    let stock = state
        .inventory
        .adjust_stock(&actor, product_id, req.delta)
        .await?;
    Ok(Json(stock))
}
