//! Orchestration of registration, login, refresh rotation, logout, password
//! reset and email verification.

use crate::db::{
    email_verification_repo, password_reset_repo, refresh_repo, refresh_repo::NewRefreshToken,
    session_repo, user_repo,
};
use crate::error::{AuthError, Result};
use crate::models::User;
use crate::security::password::PasswordHasher;
use crate::security::tokens::TokenProvider;
use crate::security::{generate_code, sha256_base64url};
use crate::services::EmailProducer;
use chrono::{DateTime, Duration, Utc};
use jwt_verify::Role;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Minimum interval between two code creations for the same user.
const CODE_COOLDOWN_SECS: i64 = 60;

const VERIFICATION_CODE_LEN: usize = 10;
const RESET_CODE_LEN: usize = 6;

/// Request-scoped client metadata extracted by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub client_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Freshly issued credentials. `refresh_hash` is for the persistence layer
/// only and is never returned to the client.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_opaque: String,
    pub refresh_expires_at: DateTime<Utc>,
    pub refresh_hash: String,
}

/// Result of token introspection. Inactive tokens yield zero fields, never
/// an error.
#[derive(Debug, Clone)]
pub struct Introspection {
    pub active: bool,
    pub user_id: Option<Uuid>,
    pub role: String,
    pub exp: Option<DateTime<Utc>>,
}

pub struct AuthService {
    db: PgPool,
    hasher: PasswordHasher,
    tokens: Arc<TokenProvider>,
    email_producer: Option<EmailProducer>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(
        db: PgPool,
        hasher: PasswordHasher,
        tokens: Arc<TokenProvider>,
        email_producer: Option<EmailProducer>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            db,
            hasher,
            tokens,
            email_producer,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Create a CUSTOMER account and seed its email-verification flow.
    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let mut tx = self.db.begin().await?;

        if user_repo::exists_by_email(&mut *tx, email).await? {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.hasher.hash(password)?;
        let user = user_repo::create(
            &mut *tx,
            Uuid::new_v4(),
            email,
            &password_hash,
            Role::Customer.as_str(),
        )
        .await?;

        let code = generate_code(VERIFICATION_CODE_LEN);
        email_verification_repo::create(
            &mut *tx,
            user.id,
            &user.email,
            &sha256_base64url(&code),
            Utc::now() + Duration::hours(24),
        )
        .await?;

        tx.commit().await?;

        self.publish_verification_code(&user.email, &code).await;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Verify credentials and issue a fresh access/refresh pair bound to a
    /// new session. Unknown email and wrong password report the same kind so
    /// callers cannot enumerate users.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        meta: ClientMeta,
    ) -> Result<(Uuid, String, TokenPair)> {
        let user = user_repo::get_by_email(&self.db, email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(&user.password_hash, password) {
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, access_expires_at) = self
            .tokens
            .sign_access(user.id, &user.role, self.access_ttl)
            .await?;
        let (refresh_opaque, refresh_hash, refresh_expires_at) =
            self.tokens.new_refresh(self.refresh_ttl);

        let client_id = meta
            .client_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut tx = self.db.begin().await?;
        let session_id = session_repo::create(
            &mut *tx,
            user.id,
            &client_id,
            meta.ip.as_deref(),
            meta.user_agent.as_deref(),
        )
        .await?;
        refresh_repo::create(
            &mut *tx,
            &NewRefreshToken {
                user_id: user.id,
                session_id: Some(session_id),
                token_hash: &refresh_hash,
                client_id: Some(&client_id),
                ip: meta.ip.as_deref(),
                user_agent: meta.user_agent.as_deref(),
                expires_at: refresh_expires_at,
            },
        )
        .await?;
        tx.commit().await?;

        info!(user_id = %user.id, "user logged in");

        Ok((
            user.id,
            user.role,
            TokenPair {
                access_token,
                access_expires_at,
                refresh_opaque,
                refresh_expires_at,
                refresh_hash,
            },
        ))
    }

    /// Rotate a refresh token: the presented row is revoked before the new
    /// pair is issued, so replaying the old opaque fails on the next call.
    pub async fn refresh(&self, refresh_opaque: &str, meta: ClientMeta) -> Result<TokenPair> {
        let hash = sha256_base64url(refresh_opaque);
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        if !refresh_repo::is_active_by_hash(&mut *tx, &hash, now).await? {
            return Err(AuthError::TokenExpired);
        }

        let presented = refresh_repo::get_unrevoked_by_hash(&mut *tx, &hash)
            .await?
            .ok_or(AuthError::TokenExpired)?;
        let user = user_repo::get_by_id(&mut *tx, presented.user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        // Lost a race with a concurrent rotation of the same opaque.
        if !refresh_repo::revoke_by_hash(&mut *tx, &hash).await? {
            return Err(AuthError::TokenExpired);
        }

        let (access_token, access_expires_at) = self
            .tokens
            .sign_access(user.id, &user.role, self.access_ttl)
            .await?;
        let (refresh_opaque, refresh_hash, refresh_expires_at) =
            self.tokens.new_refresh(self.refresh_ttl);

        refresh_repo::create(
            &mut *tx,
            &NewRefreshToken {
                user_id: user.id,
                session_id: presented.session_id,
                token_hash: &refresh_hash,
                client_id: meta.client_id.as_deref(),
                ip: meta.ip.as_deref(),
                user_agent: meta.user_agent.as_deref(),
                expires_at: refresh_expires_at,
            },
        )
        .await?;

        if let Some(session_id) = presented.session_id {
            session_repo::touch(&mut *tx, session_id, now).await?;
        }

        tx.commit().await?;

        info!(user_id = %user.id, "refresh token rotated");

        Ok(TokenPair {
            access_token,
            access_expires_at,
            refresh_opaque,
            refresh_expires_at,
            refresh_hash,
        })
    }

    /// Revoke one refresh token; the owning session is revoked too once its
    /// last active refresh row is gone.
    pub async fn logout(&self, refresh_opaque: &str) -> Result<()> {
        if refresh_opaque.trim().is_empty() {
            return Err(AuthError::Validation("empty refresh token".to_string()));
        }
        let hash = sha256_base64url(refresh_opaque);

        let token = refresh_repo::get_unrevoked_by_hash(&self.db, &hash)
            .await?
            .ok_or(AuthError::TokenNotFoundOrRevoked)?;

        if !refresh_repo::revoke_by_hash(&self.db, &hash).await? {
            return Err(AuthError::TokenNotFoundOrRevoked);
        }

        if let Some(session_id) = token.session_id {
            if !refresh_repo::has_active_for_session(&self.db, session_id, Utc::now()).await? {
                session_repo::revoke(&self.db, session_id).await?;
            }
        }

        info!(user_id = %token.user_id, "refresh token revoked");
        Ok(())
    }

    /// Revoke every refresh row and session of the user. Returns the number
    /// of refresh rows revoked.
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64> {
        let revoked = refresh_repo::revoke_all_for_user(&self.db, user_id).await?;
        session_repo::revoke_all_for_user(&self.db, user_id).await?;
        info!(user_id = %user_id, revoked, "all sessions revoked");
        Ok(revoked)
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let user = user_repo::get_by_email(&self.db, email)
            .await?
            .ok_or(AuthError::NotFound)?;

        if let Some(latest) = password_reset_repo::find_latest_for_user(&self.db, user.id).await? {
            if Utc::now() - latest.created_at < Duration::seconds(CODE_COOLDOWN_SECS) {
                return Err(AuthError::TooManyRequests);
            }
        }

        let code = generate_code(RESET_CODE_LEN);
        password_reset_repo::create(
            &self.db,
            user.id,
            &user.email,
            &sha256_base64url(&code),
            Utc::now() + Duration::hours(1),
        )
        .await?;

        self.publish_password_reset_code(&user.email, &code).await;
        info!(user_id = %user.id, "password reset requested");
        Ok(())
    }

    /// Change the password for a valid one-shot code. Everything after the
    /// password update is best-effort cleanup: it is logged, never surfaced,
    /// and never undoes the change.
    pub async fn confirm_password_reset(&self, code: &str, new_password: &str) -> Result<()> {
        let now = Utc::now();
        let reset = password_reset_repo::get_valid_by_hash(&self.db, &sha256_base64url(code), now)
            .await?
            .ok_or(AuthError::InvalidOrExpiredCode)?;

        let user = user_repo::get_by_id(&self.db, reset.user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let password_hash = self.hasher.hash(new_password)?;

        let mut tx = self.db.begin().await?;
        user_repo::update_password(&mut *tx, user.id, &password_hash).await?;
        password_reset_repo::consume(&mut *tx, reset.id).await?;
        tx.commit().await?;

        if let Err(err) = refresh_repo::revoke_all_for_user(&self.db, user.id).await {
            warn!(user_id = %user.id, error = %err, "failed to revoke refresh tokens after reset");
        }
        if let Err(err) = session_repo::revoke_all_for_user(&self.db, user.id).await {
            warn!(user_id = %user.id, error = %err, "failed to revoke sessions after reset");
        }
        if let Err(err) = password_reset_repo::delete_all_for_user(&self.db, user.id).await {
            warn!(user_id = %user.id, error = %err, "failed to delete remaining reset codes");
        }

        info!(user_id = %user.id, "password reset confirmed");
        Ok(())
    }

    pub async fn request_email_verification(&self, email: &str) -> Result<()> {
        let user = user_repo::get_by_email(&self.db, email)
            .await?
            .ok_or(AuthError::NotFound)?;

        if user.is_email_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let now = Utc::now();
        if let Some(latest) = email_verification_repo::find_latest_for_user(&self.db, user.id).await? {
            // In-progress is a state predicate, the cooldown a time predicate.
            if !latest.consumed && latest.expires_at > now {
                return Err(AuthError::VerificationInProgress);
            }
            if now - latest.created_at < Duration::seconds(CODE_COOLDOWN_SECS) {
                return Err(AuthError::TooManyRequests);
            }
        }

        let code = generate_code(VERIFICATION_CODE_LEN);
        email_verification_repo::create(
            &self.db,
            user.id,
            &user.email,
            &sha256_base64url(&code),
            now + Duration::hours(24),
        )
        .await?;

        self.publish_verification_code(&user.email, &code).await;
        info!(user_id = %user.id, "email verification requested");
        Ok(())
    }

    pub async fn confirm_email_verification(&self, code: &str) -> Result<()> {
        let now = Utc::now();
        let verification =
            email_verification_repo::get_valid_by_hash(&self.db, &sha256_base64url(code), now)
                .await?
                .ok_or(AuthError::InvalidOrExpiredCode)?;

        let user = user_repo::get_by_id(&self.db, verification.user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        user_repo::set_email_verified(&self.db, user.id).await?;

        if let Err(err) = email_verification_repo::consume(&self.db, verification.id).await {
            warn!(user_id = %user.id, error = %err, "failed to consume verification code");
        }

        info!(user_id = %user.id, "email verified");
        Ok(())
    }

    /// Validate an access token. Invalid tokens yield `active=false`, never
    /// an error.
    pub async fn introspect(&self, access_token: &str) -> Introspection {
        match self.tokens.parse_and_validate_access(access_token).await {
            Ok(validated) => Introspection {
                active: true,
                user_id: Some(validated.user_id),
                role: validated.role,
                exp: Some(validated.exp),
            },
            Err(_) => Introspection {
                active: false,
                user_id: None,
                role: String::new(),
                exp: None,
            },
        }
    }

    async fn publish_verification_code(&self, email: &str, code: &str) {
        match &self.email_producer {
            Some(producer) => {
                if let Err(err) = producer.send_verification_code(email, code).await {
                    warn!(error = %err, "failed to publish verification message");
                }
            }
            None => info!("email producer not configured; skipping verification message"),
        }
    }

    async fn publish_password_reset_code(&self, email: &str, code: &str) {
        match &self.email_producer {
            Some(producer) => {
                if let Err(err) = producer.send_password_reset_code(email, code).await {
                    warn!(error = %err, "failed to publish password reset message");
                }
            }
            None => info!("email producer not configured; skipping password reset message"),
        }
    }
}
