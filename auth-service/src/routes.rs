use crate::handlers::auth;
use crate::middleware::jwt_auth;
use crate::AppState;
use axum::routing::{get, post};
use axum::{middleware, Router};

/// Public routes cover registration, login, the refresh/reset/verification
/// flows, JWKS and introspection; only mass logout needs a bearer token.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/auth/logout-all", post(auth::logout_all))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth::require_auth,
        ));

    Router::new()
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/introspect", post(auth::introspect))
        .route("/api/v1/auth/password-reset/request", post(auth::request_password_reset))
        .route("/api/v1/auth/password-reset/confirm", post(auth::confirm_password_reset))
        .route(
            "/api/v1/auth/email-verification/request",
            post(auth::request_email_verification),
        )
        .route(
            "/api/v1/auth/email-verification/confirm",
            post(auth::confirm_email_verification),
        )
        .route("/.well-known/jwks.json", get(auth::jwks))
        .route("/healthz", get(auth::health))
        .merge(protected)
        .with_state(state)
}
