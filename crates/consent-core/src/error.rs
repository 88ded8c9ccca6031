//! Domain errors for consent-ledger core operations.
//!
//! All errors are designed to fail closed - when in doubt, deny the
//! write and surface a structured error rather than guessing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("tenant {tenant_id} is not writable: {lifecycle_state}")]
    TenantNotWritable {
        tenant_id: String,
        lifecycle_state: String,
    },

    #[error("lineage chain tamper detected at event {index}: {reason}")]
    LineageTamper { index: usize, reason: String },

    #[error("cannot append to an append-only table: {table}")]
    AppendOnlyViolation { table: String },

    #[error("idempotency key conflict for tenant {tenant_id}")]
    IdempotencyConflict { tenant_id: String },

    #[error("rate limit exceeded for identity {identity}")]
    RateLimitExceeded { identity: String },

    #[error("rate limiter backend unavailable")]
    RateLimiterUnavailable,

    #[error("identity fingerprint already bound to another scope")]
    FingerprintAlreadyBound,

    #[error("delegation chain invalid")]
    DelegationInvalid,

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("export cannot be linearized from prev-hash pointers")]
    ExportNotLinearizable,

    #[error("proof construction failed: {message}")]
    ProofConstruction { message: String },

    #[error("cryptographic error: {0}")]
    Crypto(#[from] consent_crypto::CryptoError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
