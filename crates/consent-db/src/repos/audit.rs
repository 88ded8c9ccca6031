//! Audit event log: unhashed, append-only, keyed by `(tenant_id, consent_id)`.
//!
//! `consent_id = Uuid::nil()` denotes a tenant-level event (spec section 3).

use sqlx::PgConnection;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::DbAuditEvent;
use crate::DbResult;

pub struct AuditRepo {
    pool: PgPool,
}

impl AuditRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_consent(&self, tenant_id: Uuid, consent_id: Uuid) -> DbResult<Vec<DbAuditEvent>> {
        let events = sqlx::query_as::<_, DbAuditEvent>(
            "SELECT * FROM audit_events WHERE tenant_id = $1 AND consent_id = $2 ORDER BY at ASC",
        )
        .bind(tenant_id)
        .bind(consent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    pub async fn append(&self, tenant_id: Uuid, consent_id: Uuid, action: &str, actor: &str) -> DbResult<DbAuditEvent> {
        let mut conn = self.pool.acquire().await?;
        append_audit_event(&mut conn, tenant_id, consent_id, action, actor).await
    }
}

/// Transaction-scoped append, for use inside a larger write transaction.
pub async fn append_audit_event(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    consent_id: Uuid,
    action: &str,
    actor: &str,
) -> DbResult<DbAuditEvent> {
    let event = sqlx::query_as::<_, DbAuditEvent>(
        r#"
        INSERT INTO audit_events (tenant_id, consent_id, action, actor)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(consent_id)
    .bind(action)
    .bind(actor)
    .fetch_one(conn)
    .await?;
    Ok(event)
}
