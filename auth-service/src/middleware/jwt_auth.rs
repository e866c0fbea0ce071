//! Bearer-token middleware for the few non-public auth routes.

use crate::error::AuthError;
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
) -> Result<Response, AuthError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AuthError::Unauthenticated("authorization header not found".to_string()))?;

    let token = extract_bearer(header_value)
        .ok_or_else(|| AuthError::Unauthenticated("invalid authorization scheme".to_string()))?;

    let validated = state.auth.tokens().parse_and_validate_access(token).await?;
    let role = Role::parse(&validated.role)
        .ok_or_else(|| AuthError::Unauthenticated("unknown role".to_string()))?;

    request.extensions_mut().insert(AuthUser {
        user_id: validated.user_id,
        role,
    });

    Ok(next.run(request).await)
}
