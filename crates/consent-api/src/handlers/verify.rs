//! Public, unauthenticated `POST /{lineage,proofs,anchors,system}/verify`
//! routes. Each accepts the artifact it is named for and reports
//! `verified`/`failure_reason` without requiring an API key — the whole
//! point of a tamper-evident export is that anyone holding a copy can
//! check it offline against this same logic.

use axum::Json;
use serde_json::{json, Value};

use consent_core::anchor::{verify_anchor_snapshot, AnchorSnapshot};
use consent_core::proof::verify_consent_proof;
use consent_core::system_events::{verify_system_chain, SystemEventRecord};
use consent_core::export::verify_exported_lineage;
use consent_types::DataEnvelope;

use crate::dto::system::SystemChainVerifyRequest;
use crate::dto::verify::VerifyResponse;
use crate::error::{ApiError, ApiResult};
use crate::extractors::StrictJson;

pub async fn verify_lineage(StrictJson(body): StrictJson<Value>) -> Json<DataEnvelope<VerifyResponse>> {
    let result = verify_exported_lineage(&body);
    Json(DataEnvelope::new(VerifyResponse {
        verified: result.verified,
        failure_reason: result.failure_reason,
        details: json!({ "failure_index": result.failure_index, "anchor_verified": result.anchor_verified }),
    }))
}

pub async fn verify_proof(StrictJson(body): StrictJson<Value>) -> Json<DataEnvelope<VerifyResponse>> {
    let result = verify_consent_proof(&body);
    Json(DataEnvelope::new(VerifyResponse {
        verified: result.verified,
        failure_reason: result.failure_reason,
        details: json!({ "derived_state": result.derived_state }),
    }))
}

pub async fn verify_anchors(
    StrictJson(snapshot): StrictJson<AnchorSnapshot>,
) -> ApiResult<Json<DataEnvelope<VerifyResponse>>> {
    let result = verify_anchor_snapshot(&snapshot).map_err(ApiError::from)?;
    Ok(Json(DataEnvelope::new(VerifyResponse {
        verified: result.verified,
        failure_reason: result.failure_reason,
        details: json!({}),
    })))
}

pub async fn verify_system(
    StrictJson(request): StrictJson<SystemChainVerifyRequest>,
) -> Json<DataEnvelope<VerifyResponse>> {
    let records: Vec<SystemEventRecord> = request.events.into_iter().map(SystemEventRecord::from).collect();
    let result = verify_system_chain(&records);
    Json(DataEnvelope::new(VerifyResponse {
        verified: result.verified,
        failure_reason: result.failure_reason,
        details: json!({ "failure_index": result.failure_index }),
    }))
}
