//! `POST /admin/tenants`, lifecycle transition, `POST
//! /admin/tenants/{id}/api-keys`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use consent_core::tenant::TenantLifecycle;
use consent_types::DataEnvelope;

use crate::dto::admin::{
    ApiKeyResponse, CreateApiKeyRequest, CreateApiKeyResponse, CreateTenantRequest, CreateWebhookEndpointRequest,
    TenantResponse, TransitionLifecycleRequest, WebhookEndpointResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{RequireAdmin, StrictJson};
use crate::state::AppState;

pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    StrictJson(request): StrictJson<CreateTenantRequest>,
) -> ApiResult<(StatusCode, Json<DataEnvelope<TenantResponse>>)> {
    let tenant = state.db.tenant_repo().create(&request.name).await?;
    Ok((StatusCode::CREATED, Json(DataEnvelope::new(TenantResponse::from(tenant)))))
}

pub async fn transition_lifecycle(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(tenant_id): Path<Uuid>,
    StrictJson(request): StrictJson<TransitionLifecycleRequest>,
) -> ApiResult<Json<DataEnvelope<TenantResponse>>> {
    let next = TenantLifecycle::from_str(&request.lifecycle_state)
        .ok_or_else(|| ApiError::Validation(format!("unknown lifecycle state: {}", request.lifecycle_state)))?;
    let tenant = state.db.tenant_repo().transition_lifecycle(tenant_id, next, "admin").await?;
    Ok(Json(DataEnvelope::new(TenantResponse::from(tenant))))
}

pub async fn create_api_key(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(tenant_id): Path<Uuid>,
    StrictJson(request): StrictJson<CreateApiKeyRequest>,
) -> ApiResult<(StatusCode, Json<DataEnvelope<CreateApiKeyResponse>>)> {
    let raw_key = state.auth.api_key.generate_raw_key();
    let key_hash = state.auth.api_key.hash_key(&raw_key).map_err(ApiError::from)?;
    let row = state.db.api_key_repo().create(tenant_id, &key_hash, &request.label).await?;
    let response = CreateApiKeyResponse {
        id: row.id,
        raw_key,
        label: row.label,
        created_at: row.created_at,
    };
    Ok((StatusCode::CREATED, Json(DataEnvelope::new(response))))
}

pub async fn list_api_keys(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(tenant_id): Path<Uuid>,
) -> ApiResult<Json<DataEnvelope<Vec<ApiKeyResponse>>>> {
    let rows = state.db.api_key_repo().list_by_tenant(tenant_id).await?;
    let keys = rows.into_iter().map(ApiKeyResponse::from).collect();
    Ok(Json(DataEnvelope::new(keys)))
}

pub async fn create_webhook_endpoint(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Path(tenant_id): Path<Uuid>,
    StrictJson(request): StrictJson<CreateWebhookEndpointRequest>,
) -> ApiResult<(StatusCode, Json<DataEnvelope<WebhookEndpointResponse>>)> {
    let endpoint = state
        .db
        .webhook_repo()
        .create_endpoint(tenant_id, &request.url, &request.signing_secret)
        .await?;
    Ok((StatusCode::CREATED, Json(DataEnvelope::new(WebhookEndpointResponse::from(endpoint)))))
}
