//! Process-wide system event ledger repository.
//!
//! Grounded on `core/system_events.py`'s tip discipline. Because the
//! tip lookup below runs inside the same transaction as the insert
//! (within a single Postgres session, `READ COMMITTED` sees the
//! session's own uncommitted writes), one SQL query already covers
//! both "pending, uncommitted-in-this-transaction" and "committed" tip
//! candidates the Python original's SQLAlchemy session had to branch
//! on — see DESIGN.md.

use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use tracing::warn;
use uuid::Uuid;

use consent_core::system_events::{
    compute_payload_hash, compute_system_event_hash, verify_system_chain, SystemEventRecord,
};

use crate::models::DbSystemEvent;
use crate::DbResult;

pub struct SystemEventRepo {
    pool: PgPool,
}

impl SystemEventRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        event_type: &str,
        tenant_id: Option<Uuid>,
        resource_type: Option<&str>,
        resource_id: Option<&str>,
        payload: &Value,
    ) -> DbResult<DbSystemEvent> {
        let mut conn = self.pool.acquire().await?;
        append_system_event(&mut conn, event_type, tenant_id, resource_type, resource_id, payload).await
    }

    /// Append on a brand-new connection, swallowing any error — used
    /// for failure telemetry after the primary transaction rolled back
    /// (spec.md 4.J: "on a *fresh* session so telemetry never relies on
    /// the poisoned one").
    pub async fn append_best_effort(
        &self,
        event_type: &str,
        tenant_id: Option<Uuid>,
        resource_type: Option<&str>,
        resource_id: Option<&str>,
        payload: &Value,
    ) {
        if let Err(err) = self.append(event_type, tenant_id, resource_type, resource_id, payload).await {
            warn!(event = "system_event.best_effort_failed", error = %err, event_type);
        }
    }

    pub async fn list_all(&self, limit: i64) -> DbResult<Vec<DbSystemEvent>> {
        let events = sqlx::query_as::<_, DbSystemEvent>(
            "SELECT * FROM system_events ORDER BY created_at ASC, id ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    /// Replay the full chain, recomputing every hash.
    pub async fn verify_chain(&self) -> DbResult<consent_core::system_events::SystemChainVerification> {
        let rows = self.list_all(i64::MAX).await?;
        let records: Vec<SystemEventRecord> = rows
            .into_iter()
            .map(|r| SystemEventRecord {
                event_type: r.event_type,
                tenant_id: r.tenant_id.map(|id| id.to_string()),
                resource_type: r.resource_type,
                resource_id: r.resource_id,
                payload_hash: r.payload_hash,
                prev_event_hash: r.prev_event_hash,
                event_hash: r.event_hash,
            })
            .collect();
        Ok(verify_system_chain(&records))
    }
}

/// Transaction-scoped append: locates the chain tip (the row with no
/// successor), computes the next `event_hash`, and inserts.
pub async fn append_system_event(
    conn: &mut PgConnection,
    event_type: &str,
    tenant_id: Option<Uuid>,
    resource_type: Option<&str>,
    resource_id: Option<&str>,
    payload: &Value,
) -> DbResult<DbSystemEvent> {
    let payload_hash = compute_payload_hash(payload)?;

    let tip = sqlx::query_as::<_, DbSystemEvent>(
        r#"
        SELECT se.* FROM system_events se
        WHERE NOT EXISTS (
            SELECT 1 FROM system_events child WHERE child.prev_event_hash = se.event_hash
        )
        ORDER BY se.created_at DESC, se.id DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .fetch_optional(&mut *conn)
    .await?;

    let prev_hash = tip.map(|row| row.event_hash);
    let tenant_id_str = tenant_id.map(|id| id.to_string());
    let event_hash = compute_system_event_hash(
        event_type,
        tenant_id_str.as_deref(),
        resource_type,
        resource_id,
        &payload_hash,
        prev_hash.as_deref(),
    )?;

    let event = sqlx::query_as::<_, DbSystemEvent>(
        r#"
        INSERT INTO system_events
            (tenant_id, event_type, resource_type, resource_id, payload_hash, prev_event_hash, event_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(event_type)
    .bind(resource_type)
    .bind(resource_id)
    .bind(&payload_hash)
    .bind(&prev_hash)
    .bind(&event_hash)
    .fetch_one(conn)
    .await?;

    Ok(event)
}
