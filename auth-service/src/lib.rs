//! OrderHub authentication service.
//!
//! Owns credentials, RS256 access tokens with on-disk key rotation, opaque
//! refresh-token rotation with reuse detection, sessions, the password-reset
//! and email-verification flows, and the JWKS surface consumed by every
//! other service.
//!
//! Layout:
//! - `db` — repository functions over sqlx
//! - `security` — password hashing, the RSA key store, the token provider
//! - `services` — orchestration plus the cleanup scheduler and the kafka
//!   email producer
//! - `handlers` / `routes` / `middleware` — the HTTP surface

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;
pub mod validators;

pub use error::{AuthError, Result};

use services::AuthService;
use std::sync::Arc;

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}
