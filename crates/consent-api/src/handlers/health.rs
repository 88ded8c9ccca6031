//! Liveness/readiness, grounded on `openibank-api::handlers::health`.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LiveResponse {
    pub status: &'static str,
}

pub async fn live() -> Json<LiveResponse> {
    Json(LiveResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub name: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub store: ComponentStatus,
    pub signer: ComponentStatus,
}

/// Reports `store` connectivity and whether the optional system signer
/// is configured. A missing signer never fails readiness — only
/// endpoints that explicitly request a signed artifact care.
pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadyResponse>) {
    let store = match state.db.health_check().await {
        Ok(health) if health.healthy => ComponentStatus {
            name: "postgres",
            status: "healthy",
            error: None,
        },
        Ok(_) => ComponentStatus {
            name: "postgres",
            status: "unhealthy",
            error: Some("health check query failed".to_string()),
        },
        Err(err) => ComponentStatus {
            name: "postgres",
            status: "unhealthy",
            error: Some(err.to_string()),
        },
    };

    let signer = ComponentStatus {
        name: "system_signer",
        status: if state.system_signer.is_some() { "configured" } else { "unconfigured" },
        error: None,
    };

    let healthy = store.status == "healthy";
    let status_code = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let status = if healthy { "ready" } else { "not_ready" };

    (status_code, Json(ReadyResponse { status, store, signer }))
}
