//! Idempotency key store. Grounded on `core/idempotency.py`; the
//! replay/conflict decision itself lives in `consent_core::idempotency`.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use consent_core::idempotency::{decide, IdempotencyDecision, StoredIdempotencyRow};

use crate::models::DbIdempotencyKey;
use crate::DbResult;

pub struct IdempotencyRepo {
    pool: PgPool,
}

impl IdempotencyRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, tenant_id: Uuid, key: &str) -> DbResult<Option<DbIdempotencyKey>> {
        let row = sqlx::query_as::<_, DbIdempotencyKey>(
            "SELECT * FROM idempotency_keys WHERE tenant_id = $1 AND key = $2",
        )
        .bind(tenant_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Decide replay/conflict/fresh for `(tenant_id, key)` against the
    /// freshly computed `request_hash`.
    pub async fn check(&self, tenant_id: Uuid, key: &str, request_hash: &str) -> DbResult<IdempotencyDecision> {
        let existing = self.find(tenant_id, key).await?.map(|row| StoredIdempotencyRow {
            request_hash: row.request_hash,
            response_body: row.response_json,
            response_status: row.status_code as u16,
        });
        Ok(decide(existing.as_ref(), request_hash))
    }

    /// Store the result of a freshly executed write. Must run in the
    /// same transaction as the mutation it records (spec.md 4.H).
    pub async fn store(
        &self,
        tenant_id: Uuid,
        key: &str,
        request_hash: &str,
        response_json: &Value,
        status_code: i32,
    ) -> DbResult<DbIdempotencyKey> {
        let row = sqlx::query_as::<_, DbIdempotencyKey>(
            r#"
            INSERT INTO idempotency_keys (tenant_id, key, request_hash, response_json, status_code)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(key)
        .bind(request_hash)
        .bind(response_json)
        .bind(status_code)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
