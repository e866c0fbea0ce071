//! Request translation for the auth surface.
//!
//! Handlers validate input, pull client metadata out of the request, call
//! the service layer, and shape responses. Login and refresh also return the
//! `cid` client-identity cookie and `x-client-id` header.

use crate::error::{AuthError, Result};
use crate::middleware::jwt_auth::AuthUser;
use crate::services::{ClientMeta, TokenPair};
use crate::validators;
use crate::AppState;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{DateTime, Duration, Utc};
use jwt_verify::{extract_bearer, JwksDocument};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: i64,
    pub refresh_expires_at: i64,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        // The refresh hash stays server-side; clients only see the opaque.
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_opaque,
            access_expires_at: pair.access_expires_at.timestamp(),
            refresh_expires_at: pair.refresh_expires_at.timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub role: String,
    pub tokens: TokenPairResponse,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub tokens: TokenPairResponse,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    pub revoked: u64,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailVerificationRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailVerificationConfirmRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct IntrospectRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct IntrospectResponse {
    pub active: bool,
    pub user_id: Option<Uuid>,
    pub role: String,
    pub exp_unix: i64,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    if !validators::validate_email(&req.email) {
        return Err(AuthError::Validation("invalid email".to_string()));
    }
    if !validators::validate_password(&req.password) {
        return Err(AuthError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let user = state.auth.register(&req.email, &req.password).await?;

    Ok(Json(RegisterResponse {
        user_id: user.id,
        email: user.email,
        role: user.role,
        created_at: user.created_at,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Response> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AuthError::Validation("email and password are required".to_string()));
    }

    let mut meta = client_meta(&headers, Some(peer));
    let client_id = meta
        .client_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    meta.client_id = Some(client_id.clone());

    let (user_id, role, pair) = state.auth.login(&req.email, &req.password, meta).await?;

    let body = LoginResponse {
        user_id,
        role,
        tokens: pair.into(),
    };
    Ok((client_id_headers(&client_id)?, Json(body)).into_response())
}

pub async fn refresh(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<RefreshRequest>,
) -> Result<Response> {
    if req.refresh_token.trim().is_empty() {
        return Err(AuthError::Validation("refresh_token is required".to_string()));
    }

    let mut meta = client_meta(&headers, Some(peer));
    let client_id = meta
        .client_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    meta.client_id = Some(client_id.clone());

    let pair = state.auth.refresh(req.refresh_token.trim(), meta).await?;

    let body = RefreshResponse { tokens: pair.into() };
    Ok((client_id_headers(&client_id)?, Json(body)).into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<serde_json::Value>> {
    state.auth.logout(req.refresh_token.trim()).await?;
    Ok(Json(serde_json::json!({ "revoked": true })))
}

/// Mass logout for the authenticated user. The presented access token is
/// blacklisted as well so it dies with the sessions instead of outliving
/// them until expiry.
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
) -> Result<Json<LogoutAllResponse>> {
    let revoked = state.auth.logout_all(user.user_id).await?;

    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
    {
        if let Err(err) = state.auth.tokens().blacklist_token(token).await {
            warn!(user_id = %user.user_id, error = %err, "failed to blacklist access token");
        }
    }

    Ok(Json(LogoutAllResponse { revoked }))
}

pub async fn jwks(State(state): State<AppState>) -> Result<Json<JwksDocument>> {
    let keys = state.auth.tokens().jwks().await?;
    Ok(Json(JwksDocument { keys }))
}

pub async fn introspect(
    State(state): State<AppState>,
    Json(req): Json<IntrospectRequest>,
) -> Json<IntrospectResponse> {
    let result = state.auth.introspect(&req.access_token).await;
    Json(IntrospectResponse {
        active: result.active,
        user_id: result.user_id,
        role: result.role,
        exp_unix: result.exp.map(|t| t.timestamp()).unwrap_or(0),
    })
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<Json<serde_json::Value>> {
    if !validators::validate_email(&req.email) {
        return Err(AuthError::Validation("invalid email".to_string()));
    }
    state.auth.request_password_reset(&req.email).await?;
    Ok(Json(serde_json::json!({ "sent": true })))
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetConfirmRequest>,
) -> Result<Json<serde_json::Value>> {
    if req.code.trim().is_empty() {
        return Err(AuthError::Validation("code is required".to_string()));
    }
    if !validators::validate_password(&req.new_password) {
        return Err(AuthError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    state
        .auth
        .confirm_password_reset(req.code.trim(), &req.new_password)
        .await?;
    Ok(Json(serde_json::json!({ "changed": true })))
}

pub async fn request_email_verification(
    State(state): State<AppState>,
    Json(req): Json<EmailVerificationRequest>,
) -> Result<Json<serde_json::Value>> {
    if !validators::validate_email(&req.email) {
        return Err(AuthError::Validation("invalid email".to_string()));
    }
    state.auth.request_email_verification(&req.email).await?;
    Ok(Json(serde_json::json!({ "sent": true })))
}

pub async fn confirm_email_verification(
    State(state): State<AppState>,
    Json(req): Json<EmailVerificationConfirmRequest>,
) -> Result<Json<serde_json::Value>> {
    if req.code.trim().is_empty() {
        return Err(AuthError::Validation("code is required".to_string()));
    }
    state.auth.confirm_email_verification(req.code.trim()).await?;
    Ok(Json(serde_json::json!({ "verified": true })))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ------------------------- client metadata -------------------------

const CLIENT_ID_HEADER: &str = "x-client-id";
const CLIENT_ID_COOKIE: &str = "cid";
const CLIENT_COOKIE_YEARS: i64 = 5;

fn client_meta(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientMeta {
    ClientMeta {
        client_id: client_id_from_headers(headers),
        ip: client_ip(headers, peer),
        user_agent: header_value(headers, header::USER_AGENT.as_str()),
    }
}

/// First entry of `x-forwarded-for`, falling back to the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return Some(ip.to_string());
            }
        }
    }
    peer.map(|addr| addr.ip().to_string())
}

/// `x-client-id` header, else the `cid` cookie.
fn client_id_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(id) = header_value(headers, CLIENT_ID_HEADER) {
        return Some(id);
    }
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cid_cookie)
}

fn parse_cid_cookie(cookie_header: &str) -> Option<String> {
    for part in cookie_header.split(';') {
        let part = part.trim();
        let mut kv = part.splitn(2, '=');
        let name = kv.next()?.trim();
        if name.eq_ignore_ascii_case(CLIENT_ID_COOKIE) {
            let value = kv.next().unwrap_or("").trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Response metadata carrying the client identity back: the `cid` cookie
/// (5-year expiry) and the `x-client-id` header.
fn client_id_headers(client_id: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        CLIENT_ID_HEADER,
        HeaderValue::from_str(client_id)
            .map_err(|e| AuthError::Internal(format!("invalid client id: {e}")))?,
    );
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cid_cookie(client_id))
            .map_err(|e| AuthError::Internal(format!("invalid cookie value: {e}")))?,
    );
    Ok(headers)
}

fn cid_cookie(client_id: &str) -> String {
    let expires = (Utc::now() + Duration::days(CLIENT_COOKIE_YEARS * 365))
        .format("%a, %d %b %Y %H:%M:%S GMT");
    format!("cid={client_id}; Path=/; HttpOnly; Secure; SameSite=Lax; Expires={expires}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cid_cookie_among_others() {
        assert_eq!(
            parse_cid_cookie("theme=dark; cid=abc-123; lang=en"),
            Some("abc-123".to_string())
        );
        assert_eq!(parse_cid_cookie("CID=xyz"), Some("xyz".to_string()));
        assert_eq!(parse_cid_cookie("theme=dark"), None);
        assert_eq!(parse_cid_cookie("cid="), None);
    }

    #[test]
    fn cid_cookie_carries_required_attributes() {
        let cookie = cid_cookie("abc-123");
        assert!(cookie.starts_with("cid=abc-123; "));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Expires="));
    }

    #[test]
    fn forwarded_for_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        let peer: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), Some("10.0.0.1".to_string()));

        let empty = HeaderMap::new();
        assert_eq!(client_ip(&empty, Some(peer)), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn client_id_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("x-client-id", HeaderValue::from_static("from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("cid=from-cookie"));
        assert_eq!(client_id_from_headers(&headers), Some("from-header".to_string()));

        let mut cookie_only = HeaderMap::new();
        cookie_only.insert(header::COOKIE, HeaderValue::from_static("cid=from-cookie"));
        assert_eq!(
            client_id_from_headers(&cookie_only),
            Some("from-cookie".to_string())
        );
    }
}
