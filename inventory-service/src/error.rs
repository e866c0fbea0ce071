use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InventoryError>;

/// Closed set of inventory-domain error kinds, switched once to HTTP
/// statuses in [`IntoResponse`]. Out-of-stock for individual items is not
/// here: it travels inline in the reserve response.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    #[error("currency must be RUB")]
    CurrencyMismatch,

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("forbidden")]
    Forbidden,

    #[error("product not found")]
    ProductNotFound,

    #[error("stock not found")]
    StockNotFound,

    #[error("sku already exists for vendor")]
    SkuAlreadyExists,

    #[error("reservation already exists for this order")]
    ReservationExists,

    #[error("cannot delete product with reserved stock")]
    CannotDeleteReserved,

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for InventoryError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            InventoryError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            InventoryError::InvalidQuantity => (
                StatusCode::BAD_REQUEST,
                "quantity must be greater than zero".to_string(),
            ),
            InventoryError::CurrencyMismatch => {
                (StatusCode::BAD_REQUEST, "currency must be RUB".to_string())
            }
            InventoryError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            InventoryError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            InventoryError::ProductNotFound => {
                (StatusCode::NOT_FOUND, "product not found".to_string())
            }
            InventoryError::StockNotFound => {
                (StatusCode::NOT_FOUND, "stock not found".to_string())
            }
            InventoryError::SkuAlreadyExists => (
                StatusCode::CONFLICT,
                "sku already exists for vendor".to_string(),
            ),
            InventoryError::ReservationExists => (
                StatusCode::CONFLICT,
                "reservation already exists for this order".to_string(),
            ),
            InventoryError::CannotDeleteReserved => (
                StatusCode::PRECONDITION_FAILED,
                "cannot delete product with reserved stock".to_string(),
            ),
            InventoryError::Database(_) | InventoryError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for InventoryError {
    fn from(err: sqlx::Error) -> Self {
        // The unique index on (vendor_id, lower(sku)) backstops the
        // check-then-insert; a race lands here as a conflict.
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("23505") {
                return InventoryError::SkuAlreadyExists;
            }
        }
        InventoryError::Database(err.to_string())
    }
}
