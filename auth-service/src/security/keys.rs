//! Signing-key store and JWK provider.
//!
//! At most one signing key is held in memory. On first use the provider
//! reads the persisted active row, or generates a fresh 2048-bit RSA pair,
//! records it, and flips it active. Public-key lookups by `kid` go local map
//! → redis (24h TTL) → store, warming the earlier layers on the way back.

use crate::cache::{TokenCache, JWK_CACHE_TTL};
use crate::error::{AuthError, Result};
use crate::models::JwkKey;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey};
use jwt_verify::PublicJwk;
use rand::RngCore;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

const RSA_BITS: usize = 2048;

/// Persistence port for signing keys. Backed by Postgres in production and
/// by an in-memory map in token tests.
#[async_trait]
pub trait JwkStore: Send + Sync {
    async fn create(&self, key: &JwkKey) -> Result<()>;
    async fn get_active(&self) -> Result<Option<JwkKey>>;
    async fn get_by_kid(&self, kid: &str) -> Result<Option<JwkKey>>;
    async fn set_active(&self, kid: &str) -> Result<()>;
    async fn list_public(&self) -> Result<Vec<PublicJwk>>;
}

/// Public parameters as cached in redis.
#[derive(Serialize, Deserialize)]
struct CachedJwk {
    n: String,
    e: String,
}

struct ActiveKey {
    kid: String,
    key: EncodingKey,
}

pub struct KeyProvider {
    store: Arc<dyn JwkStore>,
    cache: Option<TokenCache>,
    active: RwLock<Option<ActiveKey>>,
    public_keys: RwLock<HashMap<String, DecodingKey>>,
}

impl KeyProvider {
    pub fn new(store: Arc<dyn JwkStore>, cache: Option<TokenCache>) -> Self {
        Self {
            store,
            cache,
            active: RwLock::new(None),
            public_keys: RwLock::new(HashMap::new()),
        }
    }

    /// Make sure an active signing key exists, loading or generating one.
    /// Returns its `kid`.
    pub async fn ensure_active(&self) -> Result<String> {
        if let Some(active) = self.active.read().await.as_ref() {
            return Ok(active.kid.clone());
        }

        let mut guard = self.active.write().await;
        if let Some(active) = guard.as_ref() {
            return Ok(active.kid.clone());
        }

        if let Some(row) = self.store.get_active().await? {
            let key = EncodingKey::from_rsa_pem(row.private_pem.as_bytes())
                .map_err(|e| AuthError::Keys(format!("failed to parse stored signing key: {e}")))?;
            let kid = row.kid.clone();
            *guard = Some(ActiveKey { kid: kid.clone(), key });
            return Ok(kid);
        }

        let generated = generate_key()?;
        self.store.create(&generated.row).await?;
        self.store.set_active(&generated.row.kid).await?;
        info!(kid = %generated.row.kid, "generated new RSA signing key");

        let kid = generated.row.kid.clone();
        *guard = Some(ActiveKey {
            kid: kid.clone(),
            key: generated.key,
        });
        Ok(kid)
    }

    /// Active `kid` and encoding key for signing.
    pub async fn signing_key(&self) -> Result<(String, EncodingKey)> {
        self.ensure_active().await?;
        let guard = self.active.read().await;
        let active = guard
            .as_ref()
            .ok_or_else(|| AuthError::Keys("no active signing key".to_string()))?;
        Ok((active.kid.clone(), active.key.clone()))
    }

    /// Generate a fresh key and flip it active. Retired rows stay in the
    /// store so previously signed tokens keep verifying.
    pub async fn rotate(&self) -> Result<String> {
        let generated = generate_key()?;
        self.store.create(&generated.row).await?;
        self.store.set_active(&generated.row.kid).await?;
        info!(kid = %generated.row.kid, "rotated signing key");

        let kid = generated.row.kid.clone();
        let mut guard = self.active.write().await;
        *guard = Some(ActiveKey {
            kid: kid.clone(),
            key: generated.key,
        });
        Ok(kid)
    }

    /// Resolve the verification key for a `kid`.
    pub async fn decoding_key_for(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.public_keys.read().await.get(kid) {
            return Ok(key.clone());
        }

        if let Some(cache) = &self.cache {
            if let Some(payload) = cache.get_jwk(kid).await {
                if let Ok(cached) = serde_json::from_str::<CachedJwk>(&payload) {
                    if let Ok(key) = DecodingKey::from_rsa_components(&cached.n, &cached.e) {
                        self.public_keys
                            .write()
                            .await
                            .insert(kid.to_string(), key.clone());
                        return Ok(key);
                    }
                }
            }
        }

        let row = self
            .store
            .get_by_kid(kid)
            .await?
            .ok_or_else(|| AuthError::Unauthenticated(format!("unknown kid {kid}")))?;

        let key = DecodingKey::from_rsa_components(&row.n, &row.e)
            .map_err(|e| AuthError::Keys(format!("failed to build public key for {kid}: {e}")))?;

        self.public_keys
            .write()
            .await
            .insert(kid.to_string(), key.clone());

        if let Some(cache) = &self.cache {
            if let Ok(payload) = serde_json::to_string(&CachedJwk { n: row.n, e: row.e }) {
                cache.set_jwk(kid, &payload, JWK_CACHE_TTL).await;
            }
        }

        Ok(key)
    }

    /// All stored keys as JWKS entries, retired ones included.
    pub async fn list_public(&self) -> Result<Vec<PublicJwk>> {
        self.store.list_public().await
    }
}

struct GeneratedKey {
    row: JwkKey,
    key: EncodingKey,
}

fn generate_key() -> Result<GeneratedKey> {
    let mut rng = rand::rngs::OsRng;
    let private = RsaPrivateKey::new(&mut rng, RSA_BITS)
        .map_err(|e| AuthError::Keys(format!("RSA key generation failed: {e}")))?;

    let n = URL_SAFE_NO_PAD.encode(private.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(private.e().to_bytes_be());
    let pem = private
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| AuthError::Keys(format!("failed to serialize private key: {e}")))?
        .to_string();

    let key = EncodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| AuthError::Keys(format!("failed to parse generated key: {e}")))?;

    let row = JwkKey {
        kid: random_kid(),
        alg: "RS256".to_string(),
        kty: "RSA".to_string(),
        key_use: "sig".to_string(),
        n,
        e,
        private_pem: pem,
        active: false,
        created_at: Utc::now(),
        rotates_at: None,
    };

    Ok(GeneratedKey { row, key })
}

fn random_kid() -> String {
    let mut buf = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// In-memory store for tests that exercise signing and validation without a
/// database.
#[derive(Default)]
pub struct InMemoryJwkStore {
    keys: std::sync::Mutex<Vec<JwkKey>>,
}

#[async_trait]
impl JwkStore for InMemoryJwkStore {
    async fn create(&self, key: &JwkKey) -> Result<()> {
        self.keys.lock().unwrap().push(key.clone());
        Ok(())
    }

    async fn get_active(&self) -> Result<Option<JwkKey>> {
        Ok(self.keys.lock().unwrap().iter().find(|k| k.active).cloned())
    }

    async fn get_by_kid(&self, kid: &str) -> Result<Option<JwkKey>> {
        Ok(self
            .keys
            .lock()
            .unwrap()
            .iter()
            .find(|k| k.kid == kid)
            .cloned())
    }

    async fn set_active(&self, kid: &str) -> Result<()> {
        let mut keys = self.keys.lock().unwrap();
        if !keys.iter().any(|k| k.kid == kid) {
            return Err(AuthError::NotFound);
        }
        for key in keys.iter_mut() {
            key.active = key.kid == kid;
        }
        Ok(())
    }

    async fn list_public(&self) -> Result<Vec<PublicJwk>> {
        Ok(self
            .keys
            .lock()
            .unwrap()
            .iter()
            .map(|k| PublicJwk {
                kid: k.kid.clone(),
                kty: k.kty.clone(),
                key_use: k.key_use.clone(),
                alg: k.alg.clone(),
                n: k.n.clone(),
                e: k.e.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kid_is_base64url_of_sixteen_bytes() {
        let kid = random_kid();
        assert_eq!(kid.len(), 22);
        assert!(!kid.contains('='));
    }

    #[tokio::test]
    async fn ensure_active_generates_once_and_reuses() {
        let store = Arc::new(InMemoryJwkStore::default());
        let provider = KeyProvider::new(store.clone(), None);

        let kid1 = provider.ensure_active().await.unwrap();
        let kid2 = provider.ensure_active().await.unwrap();
        assert_eq!(kid1, kid2);

        let jwks = provider.list_public().await.unwrap();
        assert_eq!(jwks.len(), 1);
        assert_eq!(jwks[0].kid, kid1);
        assert_eq!(jwks[0].alg, "RS256");
    }

    #[tokio::test]
    async fn rotate_keeps_retired_keys_in_jwks() {
        let store = Arc::new(InMemoryJwkStore::default());
        let provider = KeyProvider::new(store.clone(), None);

        let old_kid = provider.ensure_active().await.unwrap();
        let new_kid = provider.rotate().await.unwrap();
        assert_ne!(old_kid, new_kid);

        // Only the new key is active, but both are published.
        let active = store.get_active().await.unwrap().unwrap();
        assert_eq!(active.kid, new_kid);
        let jwks = provider.list_public().await.unwrap();
        assert_eq!(jwks.len(), 2);

        // The retired key still resolves for verification.
        assert!(provider.decoding_key_for(&old_kid).await.is_ok());
    }
}
