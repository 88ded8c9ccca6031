//! `POST /consents/{id}/proof`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use consent_core::export::{build_lineage_export, StoredLineageEvent};
use consent_core::proof::build_consent_proof;
use consent_types::DataEnvelope;

use crate::dto::proof::CreateProofRequest;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{IdempotencyKey, RequireTenant, StrictJson};
use crate::handlers::support::run_idempotent;
use crate::state::AppState;

pub async fn create_proof(
    State(state): State<Arc<AppState>>,
    RequireTenant(caller): RequireTenant,
    IdempotencyKey(idempotency_key): IdempotencyKey,
    Path(consent_id): Path<Uuid>,
    StrictJson(request): StrictJson<CreateProofRequest>,
) -> ApiResult<Json<DataEnvelope<serde_json::Value>>> {
    state
        .db
        .consent_repo()
        .find_by_id(caller.tenant_id, consent_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("consent {consent_id}")))?;

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

    let tenant_id = caller.tenant_id;
    let lineage = build_lineage_export(&tenant_id.to_string(), &consent_id.to_string(), &stored, state.signer_tuple())
        .map_err(ApiError::from)?;

    let now = Utc::now();
    let asserted_at = request.asserted_at.unwrap_or(now);
    let request_body = json!({ "consent_id": consent_id, "asserted_at": asserted_at });
    let op_state = state.clone();

    let outcome = run_idempotent(
        &state.db,
        tenant_id,
        "POST",
        &format!("/consents/{consent_id}/proof"),
        &request_body,
        idempotency_key.as_deref(),
        || async move {
            let proof = build_consent_proof(
                &tenant_id.to_string(),
                &consent_id.to_string(),
                asserted_at,
                &lineage,
                now,
                op_state.signer_tuple(),
            )
            .map_err(ApiError::from)?;
            Ok((201, proof))
        },
    )
    .await?;

    let (_status, body) = outcome.into_parts();
    Ok(Json(DataEnvelope::new(body)))
}
