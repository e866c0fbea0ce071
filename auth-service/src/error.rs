use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Closed set of auth-domain error kinds.
///
/// Domain code returns these; the HTTP layer performs exactly one switch to
/// public status codes in [`IntoResponse`]. Internal messages never reach the
/// client.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("not found")]
    NotFound,

    #[error("user already exists")]
    AlreadyExists,

    #[error("refresh token expired")]
    TokenExpired,

    #[error("refresh token not found or already revoked")]
    TokenNotFoundOrRevoked,

    #[error("too many requests")]
    TooManyRequests,

    #[error("email verification already in progress")]
    VerificationInProgress,

    #[error("email already verified")]
    AlreadyVerified,

    #[error("invalid or expired code")]
    InvalidOrExpiredCode,

    #[error("signing key error: {0}")]
    Keys(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AuthError::InvalidOrExpiredCode => {
                (StatusCode::BAD_REQUEST, "invalid or expired code".to_string())
            }
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid email or password".to_string())
            }
            AuthError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AuthError::TokenExpired => {
                (StatusCode::UNAUTHORIZED, "refresh token expired".to_string())
            }
            AuthError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            AuthError::TokenNotFoundOrRevoked => (
                StatusCode::NOT_FOUND,
                "refresh token not found or already revoked".to_string(),
            ),
            AuthError::AlreadyExists => {
                (StatusCode::CONFLICT, "user already exists".to_string())
            }
            AuthError::TooManyRequests => {
                (StatusCode::TOO_MANY_REQUESTS, "too many requests".to_string())
            }
            AuthError::VerificationInProgress => (
                StatusCode::TOO_MANY_REQUESTS,
                "verification already in progress".to_string(),
            ),
            AuthError::AlreadyVerified => (
                StatusCode::PRECONDITION_FAILED,
                "email already verified".to_string(),
            ),
            AuthError::Keys(_) | AuthError::Database(_) | AuthError::Internal(_) => (
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

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        // A unique-index race (lower(email)) is a conflict, not a server
        // fault.
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("23505") {
                return AuthError::AlreadyExists;
            }
        }
        AuthError::Database(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::Unauthenticated(format!("invalid token: {err}"))
    }
}
