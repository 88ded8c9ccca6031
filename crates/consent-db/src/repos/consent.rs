//! Consent entity repository, plus the write-path orchestration that
//! ties together lineage, audit, and system events in one transaction
//! (spec.md 4.D: "lineage failure during a mutation rolls the entire
//! mutation back; no partial writes").

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use consent_core::lineage::{ConsentStatus, LineageAction, LineagePayload};

use crate::models::{DbConsent, DbLineageEvent};
use crate::repos::audit::append_audit_event;
use crate::repos::lineage::append_lineage_event;
use crate::repos::system_event::append_system_event;
use crate::{DbError, DbResult};

pub struct ConsentRepo {
    pool: PgPool,
}

impl ConsentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> DbResult<Option<DbConsent>> {
        let consent = sqlx::query_as::<_, DbConsent>(
            "SELECT * FROM consents WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(consent)
    }

    pub async fn find_by_unique(
        &self,
        tenant_id: Uuid,
        subject_id: &str,
        purpose: &str,
    ) -> DbResult<Option<DbConsent>> {
        let consent = sqlx::query_as::<_, DbConsent>(
            "SELECT * FROM consents WHERE tenant_id = $1 AND subject_id = $2 AND purpose = $3",
        )
        .bind(tenant_id)
        .bind(subject_id)
        .bind(purpose)
        .fetch_optional(&self.pool)
        .await?;
        Ok(consent)
    }

    /// Create a brand-new consent: inserts the row, appends the
    /// `created` lineage event, an audit event, and a system event, all
    /// in one transaction.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        subject_id: &str,
        purpose: &str,
        actor: &str,
    ) -> DbResult<(DbConsent, DbLineageEvent)> {
        let mut tx = self.pool.begin().await?;

        let consent = sqlx::query_as::<_, DbConsent>(
            r#"
            INSERT INTO consents (tenant_id, subject_id, purpose, status)
            VALUES ($1, $2, $3, 'ACTIVE')
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(subject_id)
        .bind(purpose)
        .fetch_one(&mut *tx)
        .await?;

        let payload = LineagePayload {
            subject_id: subject_id.to_string(),
            purpose: purpose.to_string(),
            status: ConsentStatus::Active.as_str().to_string(),
        };
        let lineage_event =
            append_lineage_event(&mut tx, tenant_id, consent.id, LineageAction::Created, &payload).await?;

        append_audit_event(&mut tx, tenant_id, consent.id, "consent.created", actor).await?;
        append_system_event(
            &mut tx,
            "consent.created",
            Some(tenant_id),
            Some("consent"),
            Some(&consent.id.to_string()),
            &json!({ "subject_id": subject_id, "purpose": purpose }),
        )
        .await?;

        tx.commit().await?;
        Ok((consent, lineage_event))
    }

    /// Apply a status-changing action (`updated`, `revoked`, `noop`) to
    /// an existing consent.
    pub async fn apply_action(
        &self,
        tenant_id: Uuid,
        consent_id: Uuid,
        action: LineageAction,
        next_status: ConsentStatus,
        actor: &str,
    ) -> DbResult<(DbConsent, DbLineageEvent)> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, DbConsent>(
            "SELECT * FROM consents WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(consent_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("consent {consent_id}")))?;

        let revoked_at = matches!(next_status, ConsentStatus::Revoked).then(|| chrono::Utc::now());
        let consent = sqlx::query_as::<_, DbConsent>(
            r#"
            UPDATE consents
            SET status = $3, updated_at = now(), revoked_at = COALESCE($4, revoked_at)
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(consent_id)
        .bind(next_status.as_str())
        .bind(revoked_at)
        .fetch_one(&mut *tx)
        .await?;

        let payload = LineagePayload {
            subject_id: existing.subject_id.clone(),
            purpose: existing.purpose.clone(),
            status: next_status.as_str().to_string(),
        };
        let lineage_event =
            append_lineage_event(&mut tx, tenant_id, consent_id, action, &payload).await?;

        append_audit_event(
            &mut tx,
            tenant_id,
            consent_id,
            &format!("consent.{}", action.as_str()),
            actor,
        )
        .await?;
        append_system_event(
            &mut tx,
            &format!("consent.{}", action.as_str()),
            Some(tenant_id),
            Some("consent"),
            Some(&consent_id.to_string()),
            &json!({ "status": next_status.as_str() }),
        )
        .await?;

        tx.commit().await?;
        Ok((consent, lineage_event))
    }
}
