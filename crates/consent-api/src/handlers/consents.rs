//! `POST /consents`, `PUT /consents`, `POST /consents/{id}/revoke`.
//!
//! Grounded on `openibank-api::handlers::wallet`'s shape (state + auth
//! extractor + DTO in, DB call, map error, DTO out) but each mutation
//! here runs through idempotency-key replay/conflict handling first.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use consent_core::lineage::{ConsentStatus, LineageAction};
use consent_core::tenant::{require_writable, TenantLifecycle};
use consent_core::webhook::dedupe_key;
use consent_db::{Database, DbLineageEvent};
use consent_types::DataEnvelope;

use crate::dto::consent::{ConsentResponse, CreateConsentRequest, RevokeConsentRequest, UpdateConsentRequest};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{IdempotencyKey, RequireTenant, StrictJson};
use crate::handlers::support::run_idempotent;
use crate::state::AppState;

/// Enqueue a webhook delivery per enabled endpoint for this tenant.
/// Best-effort: a webhook-enqueue failure must never fail the consent
/// write it accompanies, so errors are logged and swallowed, the same
/// stance `SystemEventRepo::append_best_effort` takes.
async fn enqueue_lineage_webhook(db: &Database, tenant_id: Uuid, action: LineageAction, event: &DbLineageEvent) {
    let event_type = format!("consent.{}", action.as_str());
    let payload = json!({
        "consent_id": event.consent_id,
        "action": action.as_str(),
        "event_hash": event.event_hash,
        "prev_event_hash": event.prev_event_hash,
        "created_at": event.created_at,
    });
    let key = dedupe_key(&event_type, &event.event_hash);
    if let Err(err) = db.webhook_repo().enqueue_for_tenant(tenant_id, &event_type, &payload, &key).await {
        tracing::warn!(event = "webhook.enqueue_failed", error = %err, event_type);
    }
}

async fn writable_tenant(state: &AppState, tenant_id: Uuid) -> ApiResult<()> {
    let tenant = state
        .db
        .tenant_repo()
        .find_by_id(tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("tenant {tenant_id}")))?;
    let lifecycle = TenantLifecycle::from_str(&tenant.lifecycle_state)
        .ok_or_else(|| ApiError::Internal("unknown tenant lifecycle state".to_string()))?;
    require_writable(&tenant_id.to_string(), lifecycle).map_err(ApiError::from)
}

pub async fn create_consent(
    State(state): State<Arc<AppState>>,
    RequireTenant(caller): RequireTenant,
    IdempotencyKey(idempotency_key): IdempotencyKey,
    StrictJson(request): StrictJson<CreateConsentRequest>,
) -> ApiResult<(StatusCode, Json<DataEnvelope<ConsentResponse>>)> {
    writable_tenant(&state, caller.tenant_id).await?;

    let request_body = json!({ "subject_id": &request.subject_id, "purpose": &request.purpose });
    let actor = caller.api_key_id.to_string();
    let tenant_id = caller.tenant_id;
    let op_db = state.db.clone();

    let outcome = run_idempotent(
        &state.db,
        tenant_id,
        "POST",
        "/consents",
        &request_body,
        idempotency_key.as_deref(),
        || async move {
            let (consent, lineage_event) = op_db
                .consent_repo()
                .create(tenant_id, &request.subject_id, &request.purpose, &actor)
                .await?;
            enqueue_lineage_webhook(&op_db, tenant_id, LineageAction::Created, &lineage_event).await;
            let response = ConsentResponse::from(consent);
            Ok((201, serde_json::to_value(response).expect("ConsentResponse serializes")))
        },
    )
    .await?;

    let (status, body): (u16, _) = outcome.into_parts();
    let response: ConsentResponse = serde_json::from_value(body).map_err(|e| ApiError::Internal(e.to_string()))?;
    let status_code = StatusCode::from_u16(status).unwrap_or(StatusCode::CREATED);
    Ok((status_code, Json(DataEnvelope::new(response))))
}

pub async fn update_consent(
    State(state): State<Arc<AppState>>,
    RequireTenant(caller): RequireTenant,
    IdempotencyKey(idempotency_key): IdempotencyKey,
    StrictJson(request): StrictJson<UpdateConsentRequest>,
) -> ApiResult<Json<DataEnvelope<ConsentResponse>>> {
    writable_tenant(&state, caller.tenant_id).await?;

    let next_status = match request.status.as_str() {
        "ACTIVE" => ConsentStatus::Active,
        "REVOKED" => ConsentStatus::Revoked,
        other => return Err(ApiError::Validation(format!("unknown consent status: {other}"))),
    };

    let existing = state
        .db
        .consent_repo()
        .find_by_id(caller.tenant_id, request.consent_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("consent {}", request.consent_id)))?;

    let action = if existing.status == next_status.as_str() {
        LineageAction::Noop
    } else {
        LineageAction::Updated
    };

    let request_body = json!({ "consent_id": request.consent_id, "status": request.status });
    let actor = caller.api_key_id.to_string();
    let tenant_id = caller.tenant_id;
    let consent_id = request.consent_id;
    let op_db = state.db.clone();

    let outcome = run_idempotent(
        &state.db,
        tenant_id,
        "PUT",
        "/consents",
        &request_body,
        idempotency_key.as_deref(),
        || async move {
            let (consent, lineage_event) = op_db
                .consent_repo()
                .apply_action(tenant_id, consent_id, action, next_status, &actor)
                .await?;
            enqueue_lineage_webhook(&op_db, tenant_id, action, &lineage_event).await;
            let response = ConsentResponse::from(consent);
            Ok((200, serde_json::to_value(response).expect("ConsentResponse serializes")))
        },
    )
    .await?;

    let (_status, body) = outcome.into_parts();
    let response: ConsentResponse = serde_json::from_value(body).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(DataEnvelope::new(response)))
}

pub async fn revoke_consent(
    State(state): State<Arc<AppState>>,
    RequireTenant(caller): RequireTenant,
    IdempotencyKey(idempotency_key): IdempotencyKey,
    Path(consent_id): Path<Uuid>,
    StrictJson(_request): StrictJson<RevokeConsentRequest>,
) -> ApiResult<Json<DataEnvelope<ConsentResponse>>> {
    writable_tenant(&state, caller.tenant_id).await?;

    let existing = state
        .db
        .consent_repo()
        .find_by_id(caller.tenant_id, consent_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("consent {consent_id}")))?;

    let action = if existing.status == ConsentStatus::Revoked.as_str() {
        LineageAction::Noop
    } else {
        LineageAction::Revoked
    };

    let request_body = json!({ "consent_id": consent_id });
    let actor = caller.api_key_id.to_string();
    let tenant_id = caller.tenant_id;
    let op_db = state.db.clone();

    let outcome = run_idempotent(
        &state.db,
        tenant_id,
        "POST",
        &format!("/consents/{consent_id}/revoke"),
        &request_body,
        idempotency_key.as_deref(),
        || async move {
            let (consent, lineage_event) = op_db
                .consent_repo()
                .apply_action(tenant_id, consent_id, action, ConsentStatus::Revoked, &actor)
                .await?;
            enqueue_lineage_webhook(&op_db, tenant_id, action, &lineage_event).await;
            let response = ConsentResponse::from(consent);
            Ok((200, serde_json::to_value(response).expect("ConsentResponse serializes")))
        },
    )
    .await?;

    let (_status, body) = outcome.into_parts();
    let response: ConsentResponse = serde_json::from_value(body).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(DataEnvelope::new(response)))
}
