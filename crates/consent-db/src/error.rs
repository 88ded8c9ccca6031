//! Database error types, grounded on `openibank-db::error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("core domain error: {0}")]
    Core(#[from] consent_core::CoreError),
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

impl DbError {
    /// Classify into the failure-policy kind strings `consent_core::failure`
    /// maps to an HTTP status — lets the API layer stay agnostic of sqlx.
    pub fn failure_kind(&self) -> &'static str {
        match self {
            DbError::Connection(_) | DbError::Transaction(_) => "db_unavailable",
            DbError::Query(sqlx::Error::PoolTimedOut) => "pool_timeout",
            DbError::Query(sqlx::Error::Io(_)) => "db_unavailable",
            DbError::Query(sqlx::Error::Database(db_err)) => {
                if db_err.is_unique_violation() {
                    "unique_violation"
                } else if db_err.is_foreign_key_violation() {
                    "foreign_key_violation"
                } else if db_err.is_check_violation() {
                    "constraint_violation"
                } else {
                    "unexpected"
                }
            }
            DbError::Duplicate(_) | DbError::Constraint(_) => "constraint_violation",
            DbError::Serialization(_) => "serialization_failed",
            DbError::Core(consent_core::CoreError::SignatureInvalid) => "signature_failed",
            _ => "unexpected",
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
