//! Repository functions over sqlx.
//!
//! Functions take `impl PgExecutor<'_>` so callers can run them against the
//! pool directly or inside an open transaction; the service layer owns
//! transaction boundaries.

pub mod email_verification_repo;
pub mod jwk_repo;
pub mod password_reset_repo;
pub mod refresh_repo;
pub mod session_repo;
pub mod user_repo;
