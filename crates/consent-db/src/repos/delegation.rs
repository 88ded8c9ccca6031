//! Signed parent→child delegation repository.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::DbIdentityDelegation;
use crate::DbResult;

pub struct DelegationRepo {
    pool: PgPool,
}

impl DelegationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        parent_key_id: Uuid,
        child_key_id: Uuid,
        delegation_type: &str,
        signature: &str,
    ) -> DbResult<DbIdentityDelegation> {
        let row = sqlx::query_as::<_, DbIdentityDelegation>(
            r#"
            INSERT INTO identity_delegations (parent_key_id, child_key_id, delegation_type, signature)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(parent_key_id)
        .bind(child_key_id)
        .bind(delegation_type)
        .bind(signature)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// All delegations in creation order, the same order
    /// `consent_core::delegation::verify_delegation_chain` expects.
    pub async fn list_all(&self) -> DbResult<Vec<DbIdentityDelegation>> {
        let rows = sqlx::query_as::<_, DbIdentityDelegation>(
            "SELECT * FROM identity_delegations ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_parent(&self, parent_key_id: Uuid) -> DbResult<Vec<DbIdentityDelegation>> {
        let rows = sqlx::query_as::<_, DbIdentityDelegation>(
            "SELECT * FROM identity_delegations WHERE parent_key_id = $1 ORDER BY created_at ASC",
        )
        .bind(parent_key_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
