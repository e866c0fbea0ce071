//! End-to-end auth flows over a real PostgreSQL instance.
//!
//! Run with a database available:
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/orderhub_auth_test cargo test -p auth-service -- --ignored
//! ```

use auth_service::db::jwk_repo::PgJwkStore;
use auth_service::db::{email_verification_repo, password_reset_repo};
use auth_service::error::AuthError;
use auth_service::security::keys::KeyProvider;
use auth_service::security::password::PasswordHasher;
use auth_service::security::tokens::TokenProvider;
use auth_service::security::sha256_base64url;
use auth_service::services::{AuthService, ClientMeta};
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for these tests");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");
    pool
}

async fn service(pool: &PgPool) -> AuthService {
    let keys = Arc::new(KeyProvider::new(
        Arc::new(PgJwkStore::new(pool.clone())),
        None,
    ));
    let tokens = Arc::new(TokenProvider::new(keys, None, "orderhub-auth", "orderhub"));
    AuthService::new(
        pool.clone(),
        PasswordHasher::new(),
        tokens,
        None,
        Duration::minutes(15),
        Duration::days(30),
    )
}

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4())
}

fn meta() -> ClientMeta {
    ClientMeta {
        client_id: None,
        ip: Some("10.0.0.1".to_string()),
        user_agent: Some("tests".to_string()),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn registration_seeds_email_verification() {
    let pool = test_pool().await;
    let auth = service(&pool).await;
    let email = unique_email("alice");

    let user = auth
        .register(&email, "correct horse battery staple")
        .await
        .unwrap();
    assert!(!user.is_email_verified);
    assert_eq!(user.role, "ROLE_CUSTOMER");

    // One verification row, expiring roughly a day out.
    let row = email_verification_repo::find_latest_for_user(&pool, user.id)
        .await
        .unwrap()
        .expect("verification row must exist");
    assert!(!row.consumed);
    let ttl = row.expires_at - Utc::now();
    assert!(ttl > Duration::hours(23) && ttl <= Duration::hours(24));

    // Second registration with the same email conflicts.
    let err = auth.register(&email, "another password").await.unwrap_err();
    assert!(matches!(err, AuthError::AlreadyExists));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn email_verification_code_is_single_use() {
    let pool = test_pool().await;
    let auth = service(&pool).await;
    let email = unique_email("verify");

    let user = auth.register(&email, "strong password").await.unwrap();

    // Seed a known code the way the request path does.
    let code = "known10code";
    email_verification_repo::create(
        &pool,
        user.id,
        &email,
        &sha256_base64url(code),
        Utc::now() + Duration::hours(24),
    )
    .await
    .unwrap();

    auth.confirm_email_verification(code).await.unwrap();

    let verified: bool =
        sqlx::query_scalar("SELECT is_email_verified FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(verified);

    // Replaying the consumed code fails.
    let err = auth.confirm_email_verification(code).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidOrExpiredCode));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn refresh_rotation_detects_reuse() {
    let pool = test_pool().await;
    let auth = service(&pool).await;
    let email = unique_email("rotate");

    auth.register(&email, "strong password").await.unwrap();
    let (_, _, pair1) = auth.login(&email, "strong password", meta()).await.unwrap();

    // First rotation succeeds and revokes the presented opaque.
    let pair2 = auth.refresh(&pair1.refresh_opaque, meta()).await.unwrap();
    assert_ne!(pair1.refresh_opaque, pair2.refresh_opaque);

    // Replaying the first opaque now fails.
    let err = auth.refresh(&pair1.refresh_opaque, meta()).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenExpired));

    // The second opaque still rotates normally.
    let pair3 = auth.refresh(&pair2.refresh_opaque, meta()).await.unwrap();
    assert_ne!(pair2.refresh_opaque, pair3.refresh_opaque);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn login_rejects_wrong_password_and_unknown_user_alike() {
    let pool = test_pool().await;
    let auth = service(&pool).await;
    let email = unique_email("creds");

    auth.register(&email, "strong password").await.unwrap();

    let wrong = auth.login(&email, "wrong password", meta()).await.unwrap_err();
    let missing = auth
        .login(&unique_email("ghost"), "whatever!", meta())
        .await
        .unwrap_err();

    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert!(matches!(missing, AuthError::InvalidCredentials));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn mass_logout_revokes_everything() {
    let pool = test_pool().await;
    let auth = service(&pool).await;
    let email = unique_email("massout");

    auth.register(&email, "strong password").await.unwrap();
    let (user_id, _, p1) = auth.login(&email, "strong password", meta()).await.unwrap();
    let (_, _, p2) = auth.login(&email, "strong password", meta()).await.unwrap();
    let (_, _, p3) = auth.login(&email, "strong password", meta()).await.unwrap();

    let revoked = auth.logout_all(user_id).await.unwrap();
    assert_eq!(revoked, 3);

    for opaque in [&p1.refresh_opaque, &p2.refresh_opaque, &p3.refresh_opaque] {
        let err = auth.refresh(opaque, meta()).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    let open_sessions: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_sessions WHERE user_id = $1 AND revoked = false",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(open_sessions, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn single_logout_revokes_session_with_last_token() {
    let pool = test_pool().await;
    let auth = service(&pool).await;
    let email = unique_email("logout");

    auth.register(&email, "strong password").await.unwrap();
    let (user_id, _, pair) = auth.login(&email, "strong password", meta()).await.unwrap();

    auth.logout(&pair.refresh_opaque).await.unwrap();

    // The only refresh row of the session is gone, so the session is too.
    let open_sessions: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_sessions WHERE user_id = $1 AND revoked = false",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(open_sessions, 0);

    // A second logout with the same opaque reports not-found-or-revoked.
    let err = auth.logout(&pair.refresh_opaque).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenNotFoundOrRevoked));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn password_reset_flow_invalidates_credentials() {
    let pool = test_pool().await;
    let auth = service(&pool).await;
    let email = unique_email("reset");

    auth.register(&email, "old password!").await.unwrap();
    let (user_id, _, p1) = auth.login(&email, "old password!", meta()).await.unwrap();
    let (_, _, p2) = auth.login(&email, "old password!", meta()).await.unwrap();

    // Seed a known reset code the way the request path does.
    let code = "abc123";
    password_reset_repo::create(
        &pool,
        user_id,
        &email,
        &sha256_base64url(code),
        Utc::now() + Duration::hours(1),
    )
    .await
    .unwrap();

    auth.confirm_password_reset(code, "new password!").await.unwrap();

    // Old credentials are dead, the new password works.
    assert!(auth.login(&email, "old password!", meta()).await.is_err());
    assert!(auth.login(&email, "new password!", meta()).await.is_ok());

    // All pre-reset refresh lineages are revoked.
    for opaque in [&p1.refresh_opaque, &p2.refresh_opaque] {
        assert!(auth.refresh(opaque, meta()).await.is_err());
    }

    // Every reset row for the user is wiped.
    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM password_reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn password_reset_cooldown_is_sixty_seconds() {
    let pool = test_pool().await;
    let auth = service(&pool).await;
    let email = unique_email("cooldown");

    auth.register(&email, "strong password").await.unwrap();

    auth.request_password_reset(&email).await.unwrap();
    let err = auth.request_password_reset(&email).await.unwrap_err();
    assert!(matches!(err, AuthError::TooManyRequests));

    // Backdate the latest request past the cooldown; the next one goes
    // through.
    sqlx::query(
        "UPDATE password_reset_tokens SET created_at = now() - interval '61 seconds' WHERE email = $1",
    )
    .bind(&email)
    .execute(&pool)
    .await
    .unwrap();

    auth.request_password_reset(&email).await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn verification_distinguishes_in_progress_from_cooldown() {
    let pool = test_pool().await;
    let auth = service(&pool).await;
    let email = unique_email("progress");

    auth.register(&email, "strong password").await.unwrap();

    // Registration seeded an unconsumed, unexpired code: state predicate.
    let err = auth.request_email_verification(&email).await.unwrap_err();
    assert!(matches!(err, AuthError::VerificationInProgress));

    // Consumed but recent: time predicate.
    sqlx::query("UPDATE email_verifications SET consumed = true WHERE email = $1")
        .bind(&email)
        .execute(&pool)
        .await
        .unwrap();
    let err = auth.request_email_verification(&email).await.unwrap_err();
    assert!(matches!(err, AuthError::TooManyRequests));

    // Consumed and past the cooldown: a new code is issued.
    sqlx::query(
        "UPDATE email_verifications SET created_at = now() - interval '61 seconds' WHERE email = $1",
    )
    .bind(&email)
    .execute(&pool)
    .await
    .unwrap();
    auth.request_email_verification(&email).await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn code_consumption_is_at_most_once() {
    let pool = test_pool().await;
    let auth = service(&pool).await;
    let email = unique_email("consume");

    let user = auth.register(&email, "strong password").await.unwrap();

    let id = password_reset_repo::create(
        &pool,
        user.id,
        &email,
        &sha256_base64url("one-shot"),
        Utc::now() + Duration::hours(1),
    )
    .await
    .unwrap();

    assert!(password_reset_repo::consume(&pool, id).await.unwrap());
    assert!(!password_reset_repo::consume(&pool, id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL with a PostgreSQL instance"]
async fn introspection_reports_active_and_inactive() {
    let pool = test_pool().await;
    let auth = service(&pool).await;
    let email = unique_email("introspect");

    auth.register(&email, "strong password").await.unwrap();
    let (user_id, _, pair) = auth.login(&email, "strong password", meta()).await.unwrap();

    let active = auth.introspect(&pair.access_token).await;
    assert!(active.active);
    assert_eq!(active.user_id, Some(user_id));
    assert_eq!(active.role, "ROLE_CUSTOMER");

    let inactive = auth.introspect("not-a-token").await;
    assert!(!inactive.active);
    assert_eq!(inactive.user_id, None);
    assert!(inactive.role.is_empty());
}
