use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of error codes the HTTP surface may emit.
///
/// Every failure path terminates in exactly one of these; adding a new
/// variant is a contract change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthMissing,
    AuthInvalid,
    AuthRevoked,
    TenantDisabled,
    RateLimitExceeded,
    IdempotencyConflict,
    NotFound,
    ValidationError,
    Forbidden,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthMissing => "AUTH_MISSING",
            ErrorCode::AuthInvalid => "AUTH_INVALID",
            ErrorCode::AuthRevoked => "AUTH_REVOKED",
            ErrorCode::TenantDisabled => "TENANT_DISABLED",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::IdempotencyConflict => "IDEMPOTENCY_CONFLICT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
