//! Closed failure taxonomy shared by every write path.
//!
//! Grounded on `core/failure_modes.py`: a small closed set of failure
//! classes, each mapped to exactly one HTTP status and a fail-closed
//! policy, plus a derived `{operation}.failed` system event type.

use consent_types::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    DbUnavailable,
    DbConstraintViolation,
    SignatureFailed,
    SerializationFailed,
    UnexpectedException,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    pub failure_class: FailureClass,
    pub http_status: u16,
    pub error_code: ErrorCode,
    pub fail_closed: bool,
}

impl FailureClass {
    pub fn policy(self) -> FailurePolicy {
        let (http_status, error_code) = match self {
            FailureClass::DbUnavailable => (503, ErrorCode::InternalError),
            FailureClass::DbConstraintViolation => (409, ErrorCode::IdempotencyConflict),
            FailureClass::SignatureFailed => (422, ErrorCode::ValidationError),
            FailureClass::SerializationFailed => (422, ErrorCode::ValidationError),
            FailureClass::UnexpectedException => (500, ErrorCode::InternalError),
        };
        FailurePolicy {
            failure_class: self,
            http_status,
            error_code,
            fail_closed: true,
        }
    }
}

/// Classify a storage-layer error kind (named by the caller, since the
/// concrete `sqlx::Error` type lives below `consent-core` in the
/// dependency graph — `consent-db` maps its errors to these strings).
pub fn classify_failure(kind: &str) -> FailureClass {
    match kind {
        "db_unavailable" | "pool_timeout" | "connection" => FailureClass::DbUnavailable,
        "unique_violation" | "constraint_violation" | "foreign_key_violation" => {
            FailureClass::DbConstraintViolation
        }
        "signature_failed" => FailureClass::SignatureFailed,
        "serialization_failed" => FailureClass::SerializationFailed,
        _ => FailureClass::UnexpectedException,
    }
}

pub fn failure_policy(kind: &str) -> FailurePolicy {
    classify_failure(kind).policy()
}

/// `f"{operation}.failed"`, the system event type recorded on a fresh
/// session after a write path fails and rolls back.
pub fn failure_event_type(operation: &str) -> String {
    format!("{operation}.failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_unavailable_maps_to_503() {
        assert_eq!(failure_policy("db_unavailable").http_status, 503);
    }

    #[test]
    fn constraint_violation_maps_to_409() {
        assert_eq!(failure_policy("unique_violation").http_status, 409);
    }

    #[test]
    fn unknown_kind_maps_to_500() {
        assert_eq!(failure_policy("weird").http_status, 500);
    }

    #[test]
    fn event_type_suffix() {
        assert_eq!(failure_event_type("consent.create"), "consent.create.failed");
    }
}
