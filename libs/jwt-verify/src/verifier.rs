use crate::claims::AccessClaims;
use crate::jwks::JwksDocument;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("token algorithm is not RS256")]
    BadAlgorithm,

    #[error("token header has no kid")]
    MissingKid,

    #[error("no published key for kid {0}")]
    UnknownKid(String),

    #[error("failed to fetch JWKS: {0}")]
    JwksFetch(String),

    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Validates RS256 access tokens against the auth service's JWKS document.
///
/// Decoding keys are cached by `kid`; a miss refreshes the whole document
/// once and retries the lookup. Readers share the cache behind an async
/// RwLock, so concurrent validation does not serialize on the happy path.
pub struct JwksVerifier {
    jwks_url: String,
    issuer: String,
    audience: String,
    http: reqwest::Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
}

impl JwksVerifier {
    pub fn new(jwks_url: impl Into<String>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            http: reqwest::Client::new(),
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Verify a compact access token and return its claims.
    ///
    /// Rejects tokens whose header algorithm differs from RS256, tokens
    /// without a `kid`, tokens signed by a key absent from the JWKS, and
    /// tokens failing issuer/audience/expiry checks.
    pub async fn verify(&self, token: &str) -> Result<AccessClaims, VerifyError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::BadAlgorithm);
        }
        let kid = header.kid.ok_or(VerifyError::MissingKid)?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);

        let data = decode::<AccessClaims>(token, &key, &validation)?;
        Ok(data.claims)
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key.clone());
        }

        self.refresh().await?;

        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| VerifyError::UnknownKid(kid.to_string()))
    }

    /// Re-fetch the JWKS document and rebuild the key cache.
    pub async fn refresh(&self) -> Result<(), VerifyError> {
        let doc: JwksDocument = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| VerifyError::JwksFetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| VerifyError::JwksFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| VerifyError::JwksFetch(e.to_string()))?;

        let mut fresh = HashMap::with_capacity(doc.keys.len());
        for jwk in &doc.keys {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    fresh.insert(jwk.kid.clone(), key);
                }
                Err(err) => {
                    debug!(kid = %jwk.kid, error = %err, "skipping unparseable JWKS entry");
                }
            }
        }

        let mut keys = self.keys.write().await;
        *keys = fresh;
        Ok(())
    }
}
