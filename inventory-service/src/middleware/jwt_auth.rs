//! Bearer-token middleware validating locally against the auth service's
//! published JWKS. No per-request call back into auth.

use crate::error::InventoryError;
use crate::AppState;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use jwt_verify::{extract_bearer, Role};
use uuid::Uuid;

/// Identity injected into request extensions after validation.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, InventoryError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            InventoryError::Unauthenticated("authorization header not found".to_string())
        })?;

    let token = extract_bearer(header_value).ok_or_else(|| {
        InventoryError::Unauthenticated("invalid authorization scheme".to_string())
    })?;

    let claims = state
        .verifier
        .verify(token)
        .await
        .map_err(|err| InventoryError::Unauthenticated(format!("invalid access token: {err}")))?;

    let user_id = claims
        .user_id()
        .ok_or_else(|| InventoryError::Unauthenticated("invalid subject".to_string()))?;
    let role = Role::parse(&claims.role)
        .ok_or_else(|| InventoryError::Unauthenticated("unknown role".to_string()))?;

    request.extensions_mut().insert(AuthUser { user_id, role });

    Ok(next.run(request).await)
}
