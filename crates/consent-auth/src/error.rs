//! Authentication error types, grounded on `openibank-auth::error` but
//! narrowed to the closed error-code set spec.md section 6 defines.

use thiserror::Error;

use consent_types::ErrorCode;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credentials supplied")]
    Missing,

    #[error("credentials are invalid")]
    Invalid,

    #[error("credentials have been revoked")]
    Revoked,

    #[error("tenant is not writable")]
    TenantDisabled,

    #[error("rate limit exceeded")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("insufficient permissions")]
    Forbidden,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Missing => 401,
            AuthError::Invalid => 401,
            AuthError::Revoked => 401,
            AuthError::TenantDisabled => 403,
            AuthError::RateLimitExceeded { .. } => 429,
            AuthError::Forbidden => 403,
            AuthError::Internal(_) => 500,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            AuthError::Missing => ErrorCode::AuthMissing,
            AuthError::Invalid => ErrorCode::AuthInvalid,
            AuthError::Revoked => ErrorCode::AuthRevoked,
            AuthError::TenantDisabled => ErrorCode::TenantDisabled,
            AuthError::RateLimitExceeded { .. } => ErrorCode::RateLimitExceeded,
            AuthError::Forbidden => ErrorCode::Forbidden,
            AuthError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AuthError::RateLimitExceeded { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl From<consent_db::DbError> for AuthError {
    fn from(err: consent_db::DbError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
