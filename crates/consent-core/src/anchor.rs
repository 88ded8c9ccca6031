//! Tenant anchor and external anchor snapshot.
//!
//! Grounded on `core/lineage_anchor.py` and `core/external_anchor.py`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// `sha256("ANCHOR|" | tenant_id | "|" | lineage_root_hash)` — stable
/// across API-key rotation since keys never enter the material.
pub fn compute_tenant_anchor(tenant_id: &str, lineage_root_hash: &str) -> String {
    consent_crypto::compute_tenant_anchor(tenant_id, lineage_root_hash)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorSnapshot {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub algorithm: String,
    pub anchor_count: usize,
    pub digest: String,
    pub anchors: Vec<String>,
}

/// Build a snapshot from an already-sorted, already-deduplicated list
/// of tenant anchors (callers fetch the distinct `(tenant_id,
/// consent_id)` pairs and compute each per-consent tenant anchor
/// themselves, since that requires a lineage-root lookup per pair).
pub fn build_anchor_snapshot(mut anchors: Vec<String>, generated_at: DateTime<Utc>) -> AnchorSnapshot {
    anchors.sort();
    anchors.dedup();
    let digest = consent_crypto::compute_anchor_digest(&anchors);
    AnchorSnapshot {
        version: 1,
        generated_at,
        algorithm: "SHA256".to_string(),
        anchor_count: anchors.len(),
        digest,
        anchors,
    }
}

/// One line appended to the append-only anchor-commit file:
/// `"{generated_at} | {digest}\n"`.
pub fn anchor_commit_line(snapshot: &AnchorSnapshot) -> String {
    format!(
        "{} | {}\n",
        snapshot.generated_at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
        snapshot.digest
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSnapshot {
    pub verified: bool,
    pub failure_reason: Option<String>,
}

impl VerifiedSnapshot {
    fn ok() -> Self {
        Self {
            verified: true,
            failure_reason: None,
        }
    }
    fn fail(reason: impl Into<String>) -> Self {
        Self {
            verified: false,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Reject unsupported versions/algorithms, unsorted anchors, anchor
/// count mismatch, and digest mismatch (constant-time compare).
pub fn verify_anchor_snapshot(snapshot: &AnchorSnapshot) -> CoreResult<VerifiedSnapshot> {
    if snapshot.version != 1 {
        return Ok(VerifiedSnapshot::fail("unsupported version"));
    }
    if snapshot.algorithm != "SHA256" {
        return Ok(VerifiedSnapshot::fail("unsupported algorithm"));
    }
    let mut sorted = snapshot.anchors.clone();
    sorted.sort();
    if sorted != snapshot.anchors {
        return Ok(VerifiedSnapshot::fail("anchors must be sorted"));
    }
    if snapshot.anchor_count != snapshot.anchors.len() {
        return Ok(VerifiedSnapshot::fail("anchor_count mismatch"));
    }
    let expected = consent_crypto::compute_anchor_digest(&snapshot.anchors);
    if !consent_crypto::constant_time_hex_eq(&snapshot.digest, &expected) {
        return Ok(VerifiedSnapshot::fail("digest mismatch"));
    }
    Ok(VerifiedSnapshot::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_anchor_is_stable_across_key_rotation() {
        // The anchor formula never touches API keys, so "rotating keys"
        // (a no-op on its inputs) cannot change the anchor.
        let a1 = compute_tenant_anchor("tenant-1", &"c".repeat(64));
        let a2 = compute_tenant_anchor("tenant-1", &"c".repeat(64));
        assert_eq!(a1, a2);
    }

    #[test]
    fn snapshot_round_trips() {
        let anchors = vec!["b".repeat(64), "a".repeat(64)];
        let snap = build_anchor_snapshot(anchors, Utc::now());
        assert!(verify_anchor_snapshot(&snap).unwrap().verified);
    }

    #[test]
    fn snapshot_rejects_unsorted() {
        let mut snap = build_anchor_snapshot(vec!["a".repeat(64), "b".repeat(64)], Utc::now());
        snap.anchors.reverse();
        let result = verify_anchor_snapshot(&snap).unwrap();
        assert!(!result.verified);
        assert_eq!(result.failure_reason.as_deref(), Some("anchors must be sorted"));
    }

    #[test]
    fn snapshot_rejects_digest_tamper() {
        let mut snap = build_anchor_snapshot(vec!["a".repeat(64)], Utc::now());
        snap.digest = "0".repeat(64);
        assert!(!verify_anchor_snapshot(&snap).unwrap().verified);
    }
}
