use crate::error::{InventoryError, Result};
use crate::services::{ReserveItem, ReserveOutcome};
use crate::AppState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub order_id: Uuid,
    pub items: Vec<ReserveItem>,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub order_id: Uuid,
}

pub async fn reserve(
    State(state): State<AppState>,
    Json(req): Json<ReserveRequest>,
) -> Result<Json<ReserveOutcome>> {
    if req.items.is_empty() {
        return Err(InventoryError::Validation("items must not be empty".to_string()));
    }
    let outcome = state.inventory.reserve(req.order_id, &req.items).await?;
    Ok(Json(outcome))
}

pub async fn release(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<serde_json::Value>> {
    let released = state.inventory.release(req.order_id).await?;
    Ok(Json(serde_json::json!({ "released": released })))
}

pub async fn confirm(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<serde_json::Value>> {
    let confirmed = state.inventory.confirm(req.order_id).await?;
    Ok(Json(serde_json::json!({ "confirmed": confirmed })))
}
