//! `GET /admin/system/export`, `GET /admin/system/verify`.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use consent_types::DataEnvelope;

use crate::dto::system::{SystemEventListResponse, SystemEventResponse};
use crate::error::ApiResult;
use crate::extractors::RequireAdmin;
use crate::state::AppState;

const EXPORT_LIMIT: i64 = 10_000;

pub async fn export_system_events(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> ApiResult<Json<DataEnvelope<SystemEventListResponse>>> {
    let rows = state.db.system_event_repo().list_all(EXPORT_LIMIT).await?;
    let events = rows.into_iter().map(SystemEventResponse::from).collect();
    Ok(Json(DataEnvelope::new(SystemEventListResponse { events })))
}

pub async fn verify_system_events(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
) -> ApiResult<Json<DataEnvelope<serde_json::Value>>> {
    let result = state.db.system_event_repo().verify_chain().await?;
    Ok(Json(DataEnvelope::new(serde_json::json!({
        "verified": result.verified,
        "failure_index": result.failure_index,
        "failure_reason": result.failure_reason,
    }))))
}
