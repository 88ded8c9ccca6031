//! Identity key repository: scoped Ed25519 public keys, bound for life
//! to their SHA-256 fingerprint.

use sqlx::PgPool;
use uuid::Uuid;

use consent_core::identity::{IdentityKey, IdentityScope};

use crate::models::DbIdentityKey;
use crate::{DbError, DbResult};

pub struct IdentityKeyRepo {
    pool: PgPool,
}

fn scope_str(scope: IdentityScope) -> &'static str {
    match scope {
        IdentityScope::Tenant => "tenant",
        IdentityScope::System => "system",
        IdentityScope::Admin => "admin",
    }
}

impl IdentityKeyRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a validated identity key; a unique-constraint violation
    /// on `fingerprint` means this public key is already bound to
    /// another scope (spec invariant 5).
    pub async fn insert(&self, key: &IdentityKey) -> DbResult<DbIdentityKey> {
        let row = sqlx::query_as::<_, DbIdentityKey>(
            r#"
            INSERT INTO identity_keys (scope, owner_id, public_key, fingerprint)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(scope_str(key.scope))
        .bind(&key.owner_id)
        .bind(&key.public_key_hex)
        .bind(&key.fingerprint)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Duplicate(format!("fingerprint {} already bound", key.fingerprint))
            }
            _ => DbError::Query(e),
        })?;
        Ok(row)
    }

    pub async fn find_by_fingerprint(&self, fingerprint: &str) -> DbResult<Option<DbIdentityKey>> {
        let row = sqlx::query_as::<_, DbIdentityKey>("SELECT * FROM identity_keys WHERE fingerprint = $1")
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbIdentityKey>> {
        let row = sqlx::query_as::<_, DbIdentityKey>("SELECT * FROM identity_keys WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// One-way revocation: `revoked_at` is monotonic and immutable once
    /// set, so this only ever sets it from `NULL`.
    pub async fn revoke(&self, id: Uuid) -> DbResult<DbIdentityKey> {
        let row = sqlx::query_as::<_, DbIdentityKey>(
            "UPDATE identity_keys SET revoked_at = now() WHERE id = $1 AND revoked_at IS NULL RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::InvalidInput("identity key not found or already revoked".to_string()))?;
        Ok(row)
    }
}
