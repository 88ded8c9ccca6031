//! Identity key scope/ownership invariant.
//!
//! `(scope=tenant ↔ owner_id≠null)` — a public key binds to exactly one
//! scope, for life, via its SHA-256 fingerprint (`consent_crypto`).

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityScope {
    Tenant,
    System,
    Admin,
}

/// A validated identity key record, independent of storage.
#[derive(Debug, Clone)]
pub struct IdentityKey {
    pub scope: IdentityScope,
    pub owner_id: Option<String>,
    pub public_key_hex: String,
    pub fingerprint: String,
}

impl IdentityKey {
    /// Construct and validate the scope/owner invariant plus the
    /// public-key-decodes-to-fingerprint relationship.
    pub fn new(
        scope: IdentityScope,
        owner_id: Option<String>,
        public_key_hex: &str,
    ) -> CoreResult<Self> {
        match (scope, &owner_id) {
            (IdentityScope::Tenant, None) => {
                return Err(CoreError::Validation(
                    "tenant-scoped identity keys require an owner_id".to_string(),
                ))
            }
            (IdentityScope::System | IdentityScope::Admin, Some(_)) => {
                return Err(CoreError::Validation(
                    "system/admin-scoped identity keys must not carry an owner_id".to_string(),
                ))
            }
            _ => {}
        }
        let fingerprint = consent_crypto::compute_identity_fingerprint(public_key_hex)?;
        Ok(Self {
            scope,
            owner_id,
            public_key_hex: public_key_hex.to_lowercase(),
            fingerprint,
        })
    }
}

/// Strictly append-only: callers that attempt to mutate or delete an
/// identity key, delegation, or signed assertion row must route through
/// here so the rejection always emits the matching security event.
pub fn reject_append_only_mutation(table: &str) -> CoreError {
    crate::observability::increment_metric(
        crate::observability::METRIC_APPEND_ONLY_VIOLATION_ATTEMPT,
        Some(table),
    );
    CoreError::AppendOnlyViolation {
        table: table.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_crypto::KeyPair;

    #[test]
    fn tenant_scope_requires_owner() {
        let kp = KeyPair::generate();
        assert!(IdentityKey::new(IdentityScope::Tenant, None, &kp.public_key_hex()).is_err());
        assert!(IdentityKey::new(
            IdentityScope::Tenant,
            Some("tenant-1".to_string()),
            &kp.public_key_hex()
        )
        .is_ok());
    }

    #[test]
    fn system_scope_forbids_owner() {
        let kp = KeyPair::generate();
        assert!(IdentityKey::new(
            IdentityScope::System,
            Some("tenant-1".to_string()),
            &kp.public_key_hex()
        )
        .is_err());
        assert!(IdentityKey::new(IdentityScope::System, None, &kp.public_key_hex()).is_ok());
    }
}
