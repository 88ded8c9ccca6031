//! Tenant repository: creation, lookup, and lifecycle transitions.
//!
//! Grounded on `openibank-db::repos::wallet`'s transaction pattern and
//! spec.md 4.K ("transitions update lifecycle_state + is_active, append
//! an audit event, append a system event — all one transaction").

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use consent_core::tenant::TenantLifecycle;

use crate::models::DbTenant;
use crate::repos::audit::append_audit_event;
use crate::repos::system_event::append_system_event;
use crate::{DbError, DbResult};

pub struct TenantRepo {
    pool: PgPool,
}

impl TenantRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &str) -> DbResult<DbTenant> {
        let tenant = sqlx::query_as::<_, DbTenant>(
            "INSERT INTO tenants (name) VALUES ($1) RETURNING *",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(tenant)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbTenant>> {
        let tenant = sqlx::query_as::<_, DbTenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<DbTenant>> {
        let tenant = sqlx::query_as::<_, DbTenant>("SELECT * FROM tenants WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    /// Transition lifecycle state, appending the matching audit and
    /// system events in the same transaction. Rejects a transition out
    /// of `disabled` (terminal) or into the tenant's current state.
    pub async fn transition_lifecycle(
        &self,
        tenant_id: Uuid,
        next: TenantLifecycle,
        actor: &str,
    ) -> DbResult<DbTenant> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, DbTenant>("SELECT * FROM tenants WHERE id = $1 FOR UPDATE")
            .bind(tenant_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("tenant {tenant_id}")))?;

        let Some(current_state) = TenantLifecycle::from_str(&current.lifecycle_state) else {
            return Err(DbError::InvalidInput("unknown tenant lifecycle state".to_string()));
        };
        if !current_state.can_transition_to(next) {
            return Err(DbError::InvalidInput(format!(
                "cannot transition tenant from {} to {}",
                current_state.as_str(),
                next.as_str()
            )));
        }

        let is_active = matches!(next, TenantLifecycle::Active);
        let tenant = sqlx::query_as::<_, DbTenant>(
            "UPDATE tenants SET lifecycle_state = $2, is_active = $3 WHERE id = $1 RETURNING *",
        )
        .bind(tenant_id)
        .bind(next.as_str())
        .bind(is_active)
        .fetch_one(&mut *tx)
        .await?;

        append_audit_event(
            &mut *tx,
            tenant_id,
            Uuid::nil(),
            &format!("tenant.{}", next.as_str()),
            actor,
        )
        .await?;

        append_system_event(
            &mut *tx,
            &format!("tenant.{}", next.as_str()),
            Some(tenant_id),
            Some("tenant"),
            Some(&tenant_id.to_string()),
            &json!({ "from": current_state.as_str(), "to": next.as_str() }),
        )
        .await?;

        tx.commit().await?;
        Ok(tenant)
    }
}
