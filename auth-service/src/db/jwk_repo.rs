use crate::error::{AuthError, Result};
use crate::models::JwkKey;
use crate::security::keys::JwkStore;
use async_trait::async_trait;
use jwt_verify::PublicJwk;
use sqlx::PgPool;

/// Postgres-backed signing-key store.
#[derive(Clone)]
pub struct PgJwkStore {
    pool: PgPool,
}

impl PgJwkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JwkStore for PgJwkStore {
    async fn create(&self, key: &JwkKey) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jwk_keys (kid, alg, kty, key_use, n, e, private_pem, active, rotates_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&key.kid)
        .bind(&key.alg)
        .bind(&key.kty)
        .bind(&key.key_use)
        .bind(&key.n)
        .bind(&key.e)
        .bind(&key.private_pem)
        .bind(key.active)
        .bind(key.rotates_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_active(&self) -> Result<Option<JwkKey>> {
        let key = sqlx::query_as::<_, JwkKey>(
            r#"
            SELECT kid, alg, kty, key_use, n, e, private_pem, active, created_at, rotates_at
            FROM jwk_keys
            WHERE active = true
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn get_by_kid(&self, kid: &str) -> Result<Option<JwkKey>> {
        let key = sqlx::query_as::<_, JwkKey>(
            r#"
            SELECT kid, alg, kty, key_use, n, e, private_pem, active, created_at, rotates_at
            FROM jwk_keys
            WHERE kid = $1
            "#,
        )
        .bind(kid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    /// Flip the active flag to `kid`, clearing the previous active row in the
    /// same transaction so at most one row is ever active.
    async fn set_active(&self, kid: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE jwk_keys SET active = false WHERE active = true")
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("UPDATE jwk_keys SET active = true WHERE kid = $1")
            .bind(kid)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// All stored keys, retired ones included, as JWKS entries.
    async fn list_public(&self) -> Result<Vec<PublicJwk>> {
        let rows = sqlx::query_as::<_, (String, String, String, String, String, String)>(
            "SELECT kid, kty, key_use, alg, n, e FROM jwk_keys ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(kid, kty, key_use, alg, n, e)| PublicJwk {
                kid,
                kty,
                key_use,
                alg,
                n,
                e,
            })
            .collect())
    }
}
