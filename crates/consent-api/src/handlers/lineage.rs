//! `GET /consents/{id}/lineage`, `GET /consents/{id}/lineage/export`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

use consent_core::export::{build_lineage_export, StoredLineageEvent};
use consent_types::DataEnvelope;

use crate::dto::lineage::{LineageEventResponse, LineageResponse};
use crate::error::{ApiError, ApiResult};
use crate::extractors::RequireTenant;
use crate::state::AppState;

async fn require_consent(state: &AppState, tenant_id: Uuid, consent_id: Uuid) -> ApiResult<()> {
    state
        .db
        .consent_repo()
        .find_by_id(tenant_id, consent_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("consent {consent_id}")))?;
    Ok(())
}

pub async fn get_lineage(
    State(state): State<Arc<AppState>>,
    RequireTenant(caller): RequireTenant,
    Path(consent_id): Path<Uuid>,
) -> ApiResult<Json<DataEnvelope<LineageResponse>>> {
    require_consent(&state, caller.tenant_id, consent_id).await?;

    let rows = state.db.lineage_repo().list_by_consent(caller.tenant_id, consent_id).await?;
    let events = rows.into_iter().map(LineageEventResponse::from).collect();
    Ok(Json(DataEnvelope::new(LineageResponse { events })))
}

pub async fn export_lineage(
    State(state): State<Arc<AppState>>,
    RequireTenant(caller): RequireTenant,
    Path(consent_id): Path<Uuid>,
) -> ApiResult<Json<DataEnvelope<Value>>> {
    require_consent(&state, caller.tenant_id, consent_id).await?;

    let rows = state.db.lineage_repo().list_by_consent(caller.tenant_id, consent_id).await?;
    let stored: Vec<StoredLineageEvent> = rows
        .into_iter()
        .map(|row| StoredLineageEvent {
            id: row.id,
            action: row.action,
            event_hash: row.event_hash,
            prev_event_hash: row.prev_event_hash,
            created_at: row.created_at,
        })
        .collect();

    let export = build_lineage_export(
        &caller.tenant_id.to_string(),
        &consent_id.to_string(),
        &stored,
        state.signer_tuple(),
    )
    .map_err(ApiError::from)?;

    Ok(Json(DataEnvelope::new(export)))
}
