//! Access-token signing/validation and opaque refresh minting.

use crate::cache::TokenCache;
use crate::error::{AuthError, Result};
use crate::security::keys::KeyProvider;
use crate::security::sha256_base64url;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, Header, Validation};
use jwt_verify::{AccessClaims, PublicJwk};
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use uuid::Uuid;

/// Result of a successful access-token validation.
#[derive(Debug, Clone)]
pub struct ValidatedAccess {
    pub user_id: Uuid,
    pub role: String,
    pub exp: DateTime<Utc>,
    pub jti: String,
}

pub struct TokenProvider {
    keys: Arc<KeyProvider>,
    cache: Option<TokenCache>,
    issuer: String,
    audience: String,
}

impl TokenProvider {
    pub fn new(
        keys: Arc<KeyProvider>,
        cache: Option<TokenCache>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            cache,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Sign an RS256 access token with the active key's `kid` in the header.
    pub async fn sign_access(
        &self,
        sub: Uuid,
        role: &str,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>)> {
        let (kid, key) = self.keys.signing_key().await?;

        let now = Utc::now();
        let exp = now + ttl;
        let claims = AccessClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: sub.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            role: role.to_string(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid);

        let token = encode(&header, &claims, &key)
            .map_err(|e| AuthError::Keys(format!("failed to sign access token: {e}")))?;
        Ok((token, exp))
    }

    /// Mint an opaque refresh secret: 32 random bytes as unpadded base64url
    /// (43 chars), plus its fingerprint and expiry. The opaque goes to the
    /// client, the fingerprint to the database.
    pub fn new_refresh(&self, ttl: Duration) -> (String, String, DateTime<Utc>) {
        let mut buf = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut buf);
        let opaque = URL_SAFE_NO_PAD.encode(buf);
        let hash = sha256_base64url(&opaque);
        (opaque, hash, Utc::now() + ttl)
    }

    /// Verify signature (via the JWKS resolution path), issuer, audience and
    /// expiry. Rejects non-RS256 algorithms, missing `kid`, and blacklisted
    /// `jti` when a cache is configured.
    pub async fn parse_and_validate_access(&self, token: &str) -> Result<ValidatedAccess> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::Unauthenticated(
                "unexpected signing algorithm".to_string(),
            ));
        }
        let kid = header
            .kid
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AuthError::Unauthenticated("token header has no kid".to_string()))?;

        let key = self.keys.decoding_key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);

        let data = decode::<AccessClaims>(token, &key, &validation)?;

        if let Some(cache) = &self.cache {
            if cache.is_blacklisted(&data.claims.jti).await {
                return Err(AuthError::Unauthenticated("token is blacklisted".to_string()));
            }
        }

        let user_id = data
            .claims
            .user_id()
            .ok_or_else(|| AuthError::Unauthenticated("invalid subject".to_string()))?;
        let exp = DateTime::<Utc>::from_timestamp(data.claims.exp, 0)
            .ok_or_else(|| AuthError::Unauthenticated("invalid expiry".to_string()))?;

        Ok(ValidatedAccess {
            user_id,
            role: data.claims.role,
            exp,
            jti: data.claims.jti,
        })
    }

    /// Blacklist a token's `jti` for exactly its remaining lifetime. The
    /// token is parsed without signature verification; an already expired
    /// token is a no-op. Without a cache this does nothing.
    pub async fn blacklist_token(&self, token: &str) -> Result<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };

        let claims = decode_unverified(token)?;
        if claims.jti.is_empty() {
            return Err(AuthError::Validation("token has no jti".to_string()));
        }

        let now = Utc::now().timestamp();
        if claims.exp <= now {
            return Ok(());
        }

        let ttl = StdDuration::from_secs((claims.exp - now) as u64);
        cache.blacklist(&claims.jti, ttl).await;
        Ok(())
    }

    /// JWKS listing, delegated to the key store.
    pub async fn jwks(&self) -> Result<Vec<PublicJwk>> {
        self.keys.list_public().await
    }
}

fn decode_unverified(token: &str) -> Result<AccessClaims> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::keys::InMemoryJwkStore;

    fn provider() -> TokenProvider {
        let store = Arc::new(InMemoryJwkStore::default());
        let keys = Arc::new(KeyProvider::new(store, None));
        TokenProvider::new(keys, None, "orderhub-auth", "orderhub")
    }

    #[tokio::test]
    async fn sign_then_validate_round_trips() {
        let tokens = provider();
        let user_id = Uuid::new_v4();

        let before = Utc::now();
        let (access, exp) = tokens
            .sign_access(user_id, "ROLE_CUSTOMER", Duration::minutes(15))
            .await
            .unwrap();

        let validated = tokens.parse_and_validate_access(&access).await.unwrap();
        assert_eq!(validated.user_id, user_id);
        assert_eq!(validated.role, "ROLE_CUSTOMER");
        // exp == signing moment + ttl, within a second
        let expected = before + Duration::minutes(15);
        assert!((validated.exp - expected).num_seconds().abs() <= 1);
        assert_eq!(validated.exp.timestamp(), exp.timestamp());
    }

    #[tokio::test]
    async fn access_token_carries_kid_of_active_key() {
        let tokens = provider();
        let (access, _) = tokens
            .sign_access(Uuid::new_v4(), "ROLE_ADMIN", Duration::minutes(5))
            .await
            .unwrap();

        let header = decode_header(&access).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        let kid = header.kid.unwrap();

        let jwks = tokens.jwks().await.unwrap();
        assert!(jwks.iter().any(|k| k.kid == kid));
    }

    #[tokio::test]
    async fn token_with_unknown_kid_is_rejected() {
        let signer = provider();
        let stranger = provider();

        let (access, _) = signer
            .sign_access(Uuid::new_v4(), "ROLE_CUSTOMER", Duration::minutes(5))
            .await
            .unwrap();

        // Same issuer/audience, different key store: the kid resolves nowhere.
        let err = stranger.parse_and_validate_access(&access).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn non_rs256_token_is_rejected() {
        let tokens = provider();

        let claims = AccessClaims {
            iss: "orderhub-auth".into(),
            aud: "orderhub".into(),
            sub: Uuid::new_v4().to_string(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::minutes(5)).timestamp(),
            jti: Uuid::new_v4().to_string(),
            role: "ROLE_ADMIN".into(),
        };
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("whatever".into());
        let forged = encode(&header, &claims, &jsonwebtoken::EncodingKey::from_secret(b"guess"))
            .unwrap();

        let err = tokens.parse_and_validate_access(&forged).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn token_without_kid_is_rejected() {
        let tokens = provider();
        let (kid_token, _) = tokens
            .sign_access(Uuid::new_v4(), "ROLE_CUSTOMER", Duration::minutes(5))
            .await
            .unwrap();

        // Re-sign the same claims without a kid header using the same key.
        let claims = decode_unverified(&kid_token).unwrap();
        let (_, key) = tokens.keys.signing_key().await.unwrap();
        let bare = encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap();

        let err = tokens.parse_and_validate_access(&bare).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let store = Arc::new(InMemoryJwkStore::default());
        let keys = Arc::new(KeyProvider::new(store, None));
        let signer = TokenProvider::new(keys.clone(), None, "orderhub-auth", "other-audience");
        let verifier = TokenProvider::new(keys, None, "orderhub-auth", "orderhub");

        let (access, _) = signer
            .sign_access(Uuid::new_v4(), "ROLE_CUSTOMER", Duration::minutes(5))
            .await
            .unwrap();
        assert!(verifier.parse_and_validate_access(&access).await.is_err());
    }

    #[tokio::test]
    async fn refresh_opaque_is_43_chars_of_base64url() {
        let tokens = provider();
        let (opaque, hash, exp) = tokens.new_refresh(Duration::days(30));

        assert_eq!(opaque.len(), 43);
        assert!(!opaque.contains('='));
        assert_eq!(hash, sha256_base64url(&opaque));
        assert!(exp > Utc::now() + Duration::days(29));
    }

    #[tokio::test]
    async fn refresh_opaques_do_not_repeat() {
        let tokens = provider();
        let (a, _, _) = tokens.new_refresh(Duration::days(1));
        let (b, _, _) = tokens.new_refresh(Duration::days(1));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn decode_unverified_reads_jti_and_exp() {
        let tokens = provider();
        let (access, exp) = tokens
            .sign_access(Uuid::new_v4(), "ROLE_CUSTOMER", Duration::minutes(5))
            .await
            .unwrap();

        let claims = decode_unverified(&access).unwrap();
        assert!(!claims.jti.is_empty());
        assert_eq!(claims.exp, exp.timestamp());
    }

    #[tokio::test]
    async fn blacklist_without_cache_is_a_noop() {
        let tokens = provider();
        let (access, _) = tokens
            .sign_access(Uuid::new_v4(), "ROLE_CUSTOMER", Duration::minutes(5))
            .await
            .unwrap();
        tokens.blacklist_token(&access).await.unwrap();
        // Still valid: no cache means no blacklist.
        assert!(tokens.parse_and_validate_access(&access).await.is_ok());
    }
}
