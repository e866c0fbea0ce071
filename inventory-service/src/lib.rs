//! OrderHub inventory service.
//!
//! Product catalog with per-vendor role gating, 1:1 stock rows mutated only
//! through conditional SQL, and the atomic reserve → confirm/release
//! protocol backing the order saga.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

pub use error::{InventoryError, Result};

use jwt_verify::JwksVerifier;
use services::InventoryService;
use std::sync::Arc;

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub inventory: Arc<InventoryService>,
    pub verifier: Arc<JwksVerifier>,
}
