//! Per-consent lineage chain repository.
//!
//! Grounded on `core/lineage.py`'s append discipline and
//! `consent-core::lineage` for the pure hash/monotonic-clock math. Tip
//! lookup happens inside the caller's transaction — see
//! `repos::system_event` for why that single query already covers both
//! pending and committed candidates under Postgres `READ COMMITTED`.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use consent_core::lineage::{self, ConsentStatus, LineageAction, LineagePayload};

use crate::models::DbLineageEvent;
use crate::DbResult;

pub struct LineageRepo {
    pool: PgPool,
}

impl LineageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinct `(tenant_id, consent_id)` pairs with at least one
    /// lineage event, for anchor-snapshot building (spec.md 6: callers
    /// compute a per-consent tenant anchor for each pair themselves).
    pub async fn distinct_consents(&self) -> DbResult<Vec<(Uuid, Uuid)>> {
        let rows: Vec<(Uuid, Uuid)> =
            sqlx::query_as("SELECT DISTINCT tenant_id, consent_id FROM consent_lineage_events")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    pub async fn list_by_consent(&self, tenant_id: Uuid, consent_id: Uuid) -> DbResult<Vec<DbLineageEvent>> {
        let events = sqlx::query_as::<_, DbLineageEvent>(
            "SELECT * FROM consent_lineage_events WHERE tenant_id = $1 AND consent_id = $2 ORDER BY created_at ASC, id ASC",
        )
        .bind(tenant_id)
        .bind(consent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    /// Replay the chain against the consent's current status and field
    /// values; `Ok(false)` on any hash or continuity mismatch.
    pub async fn verify(
        &self,
        tenant_id: Uuid,
        consent_id: Uuid,
        subject_id: &str,
        purpose: &str,
        current_status: ConsentStatus,
    ) -> DbResult<bool> {
        let rows = self.list_by_consent(tenant_id, consent_id).await?;
        let records = rows
            .iter()
            .map(|row| {
                Ok(lineage::LineageEventRecord {
                    action: lineage::parse_action(&row.action)?,
                    event_hash: row.event_hash.clone(),
                    prev_event_hash: row.prev_event_hash.clone(),
                    created_at: row.created_at,
                })
            })
            .collect::<DbResult<Vec<_>>>()?;
        Ok(lineage::verify_lineage_chain(
            &records,
            &tenant_id.to_string(),
            &consent_id.to_string(),
            subject_id,
            purpose,
            current_status,
        )?)
    }
}

/// Transaction-scoped append: locates the tip for `(tenant_id,
/// consent_id)`, computes `prev_hash`/`event_hash`, applies the
/// monotonic-microsecond clock rule, and inserts.
pub async fn append_lineage_event(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    consent_id: Uuid,
    action: LineageAction,
    payload: &LineagePayload,
) -> DbResult<DbLineageEvent> {
    let tip = sqlx::query_as::<_, DbLineageEvent>(
        r#"
        SELECT * FROM consent_lineage_events
        WHERE tenant_id = $1 AND consent_id = $2
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(tenant_id)
    .bind(consent_id)
    .fetch_optional(&mut *conn)
    .await?;

    let prev_hash = tip.as_ref().map(|row| row.event_hash.clone());
    let created_at = lineage::next_created_at(Utc::now(), tip.as_ref().map(|row| row.created_at));
    let event_hash = lineage::compute_lineage_event_hash(
        &tenant_id.to_string(),
        &consent_id.to_string(),
        action,
        payload,
        prev_hash.as_deref(),
    )?;

    let event = sqlx::query_as::<_, DbLineageEvent>(
        r#"
        INSERT INTO consent_lineage_events
            (tenant_id, consent_id, action, event_hash, prev_event_hash, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(consent_id)
    .bind(action.as_str())
    .bind(&event_hash)
    .bind(&prev_hash)
    .bind(created_at)
    .fetch_one(conn)
    .await?;

    Ok(event)
}
