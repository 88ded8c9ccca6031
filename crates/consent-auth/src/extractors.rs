//! Shared response-building helpers for rejected requests, grounded on
//! `openibank-auth::middleware::auth_error_response`.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::Response;

use consent_types::ErrorEnvelope;

use crate::error::AuthError;

pub fn auth_error_response(error: AuthError) -> Response {
    let status = StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let retry_after = error.retry_after_secs();
    let envelope = ErrorEnvelope::new(error.error_code(), error.to_string(), "unknown");

    let mut builder = Response::builder().status(status).header("Content-Type", "application/json");
    if let Some(retry_after) = retry_after {
        builder = builder.header("Retry-After", retry_after.to_string());
    }

    builder
        .body(Body::from(serde_json::to_string(&envelope).unwrap_or_default()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
