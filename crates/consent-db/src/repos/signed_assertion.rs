//! Signed assertion repository (spec section 3: arbitrary Ed25519-signed
//! claims over a subject, append-only, gated on tenant writability for
//! tenant-scoped signer keys).

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::DbSignedAssertion;
use crate::DbResult;

pub struct SignedAssertionRepo {
    pool: PgPool,
}

impl SignedAssertionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        identity_key_id: Uuid,
        subject_type: &str,
        subject_id: Option<&str>,
        assertion_type: &str,
        payload: &Value,
        signature: &str,
    ) -> DbResult<DbSignedAssertion> {
        let row = sqlx::query_as::<_, DbSignedAssertion>(
            r#"
            INSERT INTO signed_assertions
                (identity_key_id, subject_type, subject_id, assertion_type, payload, signature)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(identity_key_id)
        .bind(subject_type)
        .bind(subject_id)
        .bind(assertion_type)
        .bind(payload)
        .bind(signature)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_by_subject(&self, subject_type: &str, subject_id: &str) -> DbResult<Vec<DbSignedAssertion>> {
        let rows = sqlx::query_as::<_, DbSignedAssertion>(
            "SELECT * FROM signed_assertions WHERE subject_type = $1 AND subject_id = $2 ORDER BY created_at ASC",
        )
        .bind(subject_type)
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
