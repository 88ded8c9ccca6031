//! HTTP-facing error type. Maps every failure path this crate can
//! produce into the closed `{code, message, request_id}` envelope from
//! spec section 6/7. Deliberately not a copy of `openibank-api::error`'s
//! thin `ApiError{code,message}` — every leaf error type in the
//! workspace (`AuthError`, `DbError`, `CoreError`) needs a `From` impl
//! here so handlers can just use `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use consent_core::failure::failure_policy;
use consent_core::CoreError;
use consent_auth::AuthError;
use consent_db::DbError;
use consent_types::{ErrorCode, ErrorEnvelope};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("tenant is not writable: {0}")]
    TenantDisabled(String),

    #[error("idempotency key conflict")]
    IdempotencyConflict,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::TenantDisabled(_) => StatusCode::FORBIDDEN,
            ApiError::IdempotencyConflict => StatusCode::CONFLICT,
            ApiError::Auth(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            ApiError::Validation(_) => ErrorCode::ValidationError,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::Forbidden(_) => ErrorCode::Forbidden,
            ApiError::TenantDisabled(_) => ErrorCode::TenantDisabled,
            ApiError::IdempotencyConflict => ErrorCode::IdempotencyConflict,
            ApiError::Auth(err) => err.error_code(),
            ApiError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Build the response envelope once `request_id` is known; handlers
    /// never build `ErrorEnvelope` by hand.
    pub fn into_response_with_request_id(self, request_id: &str) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            ApiError::Auth(err) => err.retry_after_secs(),
            _ => None,
        };
        let envelope = ErrorEnvelope::new(self.error_code(), self.to_string(), request_id);
        let mut response = (status, Json(envelope)).into_response();
        if let Some(retry_after) = retry_after {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}

/// Without a request ID in scope, callers fall back to `"unknown"` — the
/// top-level middleware always has a real one by the time a response
/// actually leaves the router (see `middleware::request_id_middleware`).
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with_request_id("unknown")
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::TenantNotWritable { tenant_id, .. } => ApiError::TenantDisabled(tenant_id),
            CoreError::IdempotencyConflict { .. } => ApiError::IdempotencyConflict,
            CoreError::Validation(msg) => ApiError::Validation(msg),
            CoreError::NotFound(msg) => ApiError::NotFound(msg),
            CoreError::LineageTamper { .. }
            | CoreError::DelegationInvalid
            | CoreError::SignatureInvalid
            | CoreError::ExportNotLinearizable
            | CoreError::ProofConstruction { .. } => ApiError::Validation(err.to_string()),
            CoreError::FingerprintAlreadyBound => ApiError::Validation(err.to_string()),
            CoreError::AppendOnlyViolation { .. } => ApiError::Forbidden(err.to_string()),
            CoreError::RateLimitExceeded { .. } | CoreError::RateLimiterUnavailable => {
                ApiError::Internal(err.to_string())
            }
            CoreError::Crypto(_) | CoreError::Serialization(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => ApiError::NotFound(msg),
            DbError::Duplicate(msg) | DbError::Constraint(msg) => ApiError::Validation(msg),
            DbError::InvalidInput(msg) => ApiError::Validation(msg),
            DbError::Core(core_err) => ApiError::from(core_err),
            other => {
                let policy = failure_policy(other.failure_kind());
                match policy.error_code {
                    ErrorCode::ValidationError => ApiError::Validation(other.to_string()),
                    ErrorCode::IdempotencyConflict => ApiError::IdempotencyConflict,
                    _ => ApiError::Internal(other.to_string()),
                }
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
