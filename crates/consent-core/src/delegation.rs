//! Signed parent→child delegation chains with cycle detection.
//!
//! Grounded on `core/delegation_verify.py::verify_delegation_chain` and
//! `core/identity_crypto.py`; the cycle-detection strategy (adjacency
//! map of parent fingerprint → child fingerprints, DFS from the
//! candidate child toward the candidate parent) is exactly spec.md
//! 9's "Cyclic dependency risk" design note.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::observability::{increment_metric, METRIC_DELEGATION_VERIFICATION_FAILED};

#[derive(Debug, Clone)]
pub struct DelegationRecord {
    pub parent_fingerprint: String,
    pub child_fingerprint: String,
    pub delegation_type: String,
    pub parent_public_key: String,
    pub child_public_key: String,
    pub signature: String,
    pub created_at: DateTime<Utc>,
}

/// The message signed by the parent key to authorize a delegation:
/// `canonical_json({parent_fingerprint, child_fingerprint, delegation_type})`.
pub fn canonical_delegation_message(
    parent_fingerprint: &str,
    child_fingerprint: &str,
    delegation_type: &str,
) -> Vec<u8> {
    let value = json!({
        "parent_fingerprint": parent_fingerprint,
        "child_fingerprint": child_fingerprint,
        "delegation_type": delegation_type,
    });
    consent_crypto::canonical_json(&value)
        .expect("delegation message is always serializable")
        .into_bytes()
}

fn would_create_cycle(
    children_by_parent: &HashMap<String, HashSet<String>>,
    parent: &str,
    child: &str,
) -> bool {
    if parent == child {
        return true;
    }
    let mut stack = vec![child.to_string()];
    let mut seen = HashSet::new();
    while let Some(node) = stack.pop() {
        if node == parent {
            return true;
        }
        if !seen.insert(node.clone()) {
            continue;
        }
        if let Some(children) = children_by_parent.get(&node) {
            stack.extend(children.iter().cloned());
        }
    }
    false
}

fn delegation_failure(reason: &str) -> bool {
    increment_metric(METRIC_DELEGATION_VERIFICATION_FAILED, Some(reason));
    tracing::warn!(
        event = "security.delegation_verification_failed",
        reason,
        "delegation chain rejected"
    );
    false
}

/// Verify a presented delegation chain rooted at `root_identity_fingerprint`.
/// Returns `false` on any failure without exposing which check failed —
/// callers only learn the reason through the security event/metric.
pub fn verify_delegation_chain(
    delegations: &[DelegationRecord],
    root_identity_fingerprint: &str,
) -> bool {
    let mut reachable: HashSet<String> = HashSet::new();
    reachable.insert(root_identity_fingerprint.to_string());
    let mut children_by_parent: HashMap<String, HashSet<String>> = HashMap::new();
    let mut last_time: Option<DateTime<Utc>> = None;

    for delegation in delegations {
        if let Some(last) = last_time {
            if delegation.created_at < last {
                return delegation_failure("non_monotonic_created_at");
            }
        }
        last_time = Some(delegation.created_at);

        let Ok(parent_computed) =
            consent_crypto::compute_identity_fingerprint(&delegation.parent_public_key)
        else {
            return delegation_failure("invalid_parent_public_key");
        };
        if parent_computed != delegation.parent_fingerprint {
            return delegation_failure("parent_fingerprint_mismatch");
        }

        let Ok(child_computed) =
            consent_crypto::compute_identity_fingerprint(&delegation.child_public_key)
        else {
            return delegation_failure("invalid_child_public_key");
        };
        if child_computed != delegation.child_fingerprint {
            return delegation_failure("child_fingerprint_mismatch");
        }

        if !reachable.contains(&delegation.parent_fingerprint) {
            return delegation_failure("parent_not_reachable");
        }

        if would_create_cycle(
            &children_by_parent,
            &delegation.parent_fingerprint,
            &delegation.child_fingerprint,
        ) {
            return delegation_failure("cycle_detected");
        }

        let message = canonical_delegation_message(
            &delegation.parent_fingerprint,
            &delegation.child_fingerprint,
            &delegation.delegation_type,
        );
        if !consent_crypto::verify_bytes(
            &delegation.parent_public_key,
            &message,
            &delegation.signature,
        ) {
            return delegation_failure("signature_verification_failed");
        }

        children_by_parent
            .entry(delegation.parent_fingerprint.clone())
            .or_default()
            .insert(delegation.child_fingerprint.clone());
        reachable.insert(delegation.child_fingerprint.clone());
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_crypto::KeyPair;

    fn make_delegation(parent: &KeyPair, child: &KeyPair, delegation_type: &str) -> DelegationRecord {
        let parent_fp = parent.fingerprint();
        let child_fp = child.fingerprint();
        let message = canonical_delegation_message(&parent_fp, &child_fp, delegation_type);
        let signature = consent_crypto::sign_bytes(parent, &message);
        DelegationRecord {
            parent_fingerprint: parent_fp,
            child_fingerprint: child_fp,
            delegation_type: delegation_type.to_string(),
            parent_public_key: parent.public_key_hex(),
            child_public_key: child.public_key_hex(),
            signature,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn accepts_simple_chain() {
        let root = KeyPair::generate();
        let child = KeyPair::generate();
        let delegation = make_delegation(&root, &child, "act-on-behalf");
        assert!(verify_delegation_chain(&[delegation], &root.fingerprint()));
    }

    #[test]
    fn rejects_two_cycle() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let a_to_b = make_delegation(&a, &b, "act-on-behalf");
        let b_to_a = make_delegation(&b, &a, "act-on-behalf");
        assert!(!verify_delegation_chain(&[a_to_b, b_to_a], &a.fingerprint()));
    }

    #[test]
    fn rejects_unreachable_parent() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let c = KeyPair::generate();
        // b -> c, but root is a, and b was never delegated from a.
        let b_to_c = make_delegation(&b, &c, "act-on-behalf");
        assert!(!verify_delegation_chain(&[b_to_c], &a.fingerprint()));
    }

    #[test]
    fn rejects_tampered_signature() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let mut delegation = make_delegation(&a, &b, "act-on-behalf");
        delegation.signature = "00".repeat(64);
        assert!(!verify_delegation_chain(&[delegation], &a.fingerprint()));
    }
}
