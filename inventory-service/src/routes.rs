use crate::handlers::{self, products, reservations, stock};
use crate::middleware::jwt_auth;
use crate::AppState;
use axum::routing::{delete, get, patch, post, put};
use axum::{middleware, Router};

/// Reads are public; catalog and stock mutations plus the saga endpoints
/// require a bearer token.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/products", post(products::create_product))
        .route("/api/v1/products/:id", patch(products::update_product))
        .route("/api/v1/products/:id", delete(products::delete_product))
        .route("/api/v1/products/:id/stock", put(stock::set_stock))
        .route("/api/v1/products/:id/stock/adjust", post(stock::adjust_stock))
        .route("/api/v1/reservations/reserve", post(reservations::reserve))
        .route("/api/v1/reservations/release", post(reservations::release))
        .route("/api/v1/reservations/confirm", post(reservations::confirm))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth::require_auth,
        ));

    Router::new()
        .route("/api/v1/products", get(products::list_products))
        .route("/api/v1/products/:id", get(products::get_product))
        .route("/api/v1/products/batch-get", post(products::batch_get_products))
        .route("/api/v1/products/:id/stock", get(stock::get_stock))
        .route("/healthz", get(handlers::health))
        .merge(protected)
        .with_state(state)
}
