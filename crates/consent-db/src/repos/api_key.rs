//! Tenant API key repository. `key_hash` is an HMAC-SHA256 of the raw
//! key under the server secret — the raw key itself is never stored.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::DbApiKey;
use crate::DbResult;

pub struct ApiKeyRepo {
    pool: PgPool,
}

impl ApiKeyRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, tenant_id: Uuid, key_hash: &str, label: &str) -> DbResult<DbApiKey> {
        let row = sqlx::query_as::<_, DbApiKey>(
            r#"
            INSERT INTO api_keys (tenant_id, key_hash, label)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(key_hash)
        .bind(label)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_active_by_hash(&self, key_hash: &str) -> DbResult<Option<DbApiKey>> {
        let row = sqlx::query_as::<_, DbApiKey>(
            "SELECT * FROM api_keys WHERE key_hash = $1 AND revoked_at IS NULL",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_by_tenant(&self, tenant_id: Uuid) -> DbResult<Vec<DbApiKey>> {
        let rows = sqlx::query_as::<_, DbApiKey>(
            "SELECT * FROM api_keys WHERE tenant_id = $1 ORDER BY created_at ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Revocation is irreversible: only ever sets `revoked_at` from NULL.
    pub async fn revoke(&self, id: Uuid) -> DbResult<DbApiKey> {
        let row = sqlx::query_as::<_, DbApiKey>(
            "UPDATE api_keys SET revoked_at = now() WHERE id = $1 AND revoked_at IS NULL RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| crate::DbError::InvalidInput("api key not found or already revoked".to_string()))?;
        Ok(row)
    }
}
