//! Consent-state-at-time proof: build and verify.
//!
//! Grounded on `core/consent_proof.py` (builder) and
//! `core/lineage_verify.py::verify_consent_proof`.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::export::verify_exported_lineage;
use crate::observability::{increment_metric, METRIC_SIGNATURE_VERIFICATION_FAILED};

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts).ok().map(|dt| dt.with_timezone(&Utc))
}

fn derive_state_from_actions(included_events: &[Value]) -> String {
    if included_events.is_empty() {
        return "UNKNOWN".to_string();
    }
    let mut state = "UNKNOWN".to_string();
    for event in included_events {
        match event.get("action").and_then(Value::as_str) {
            Some("created") => state = "ACTIVE".to_string(),
            Some("revoked") => state = "REVOKED".to_string(),
            Some("updated") => {
                state = match state.as_str() {
                    "ACTIVE" => "REVOKED".to_string(),
                    "REVOKED" => "ACTIVE".to_string(),
                    _ => "UNKNOWN".to_string(),
                }
            }
            Some("noop") => continue,
            _ => state = "UNKNOWN".to_string(),
        }
    }
    state
}

/// Build a `CONSENT_STATE_AT_TIME` proof from an already-built lineage
/// export `Value` (see `export::build_lineage_export`).
pub fn build_consent_proof(
    tenant_id: &str,
    consent_id: &str,
    asserted_at: DateTime<Utc>,
    lineage: &Value,
    now: DateTime<Utc>,
    signer: Option<(&str, &str, &str)>,
) -> CoreResult<Value> {
    let events = lineage
        .get("events")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let latest_event_time = events
        .iter()
        .filter_map(|e| e.get("created_at").and_then(Value::as_str))
        .filter_map(parse_rfc3339)
        .max();

    let effective_now = match latest_event_time {
        Some(t) if t > now => t,
        _ => now,
    };
    if asserted_at > effective_now {
        return Err(CoreError::Validation("asserted_at cannot be in the future".to_string()));
    }

    let included_events: Vec<Value> = events
        .iter()
        .filter(|e| {
            e.get("created_at")
                .and_then(Value::as_str)
                .and_then(parse_rfc3339)
                .map(|t| t <= asserted_at)
                .unwrap_or(false)
        })
        .map(|e| {
            json!({
                "action": e.get("action").cloned().unwrap_or(Value::Null),
                "event_hash": e.get("event_hash").cloned().unwrap_or(Value::Null),
                "created_at": e.get("created_at").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    if included_events.is_empty() {
        return Err(CoreError::Validation(
            "no lineage events exist at or before asserted_at".to_string(),
        ));
    }

    let asserted_state = derive_state_from_actions(&included_events);
    if asserted_state != "ACTIVE" && asserted_state != "REVOKED" {
        return Err(CoreError::Validation(
            "unable to derive asserted_state from included events".to_string(),
        ));
    }

    let mut proof = json!({
        "version": 1,
        "proof_type": "CONSENT_STATE_AT_TIME",
        "tenant_id": tenant_id,
        "consent_id": consent_id,
        "asserted_at": asserted_at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        "asserted_state": asserted_state,
        "tenant_anchor": lineage.get("tenant_anchor").cloned().unwrap_or(Value::Null),
        "lineage": lineage,
        "included_events": included_events,
    });

    if let Some((fingerprint, public_key, private_key_hex)) = signer {
        let computed = consent_crypto::compute_identity_fingerprint(public_key)?;
        if computed != fingerprint {
            return Err(CoreError::Validation(
                "signer public key does not match signer_identity_fingerprint".to_string(),
            ));
        }
        let included_root_hash = proof["included_events"]
            .as_array()
            .and_then(|a| a.last())
            .and_then(|e| e.get("event_hash"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let signable = json!({
            "asserted_at": proof["asserted_at"],
            "asserted_state": proof["asserted_state"],
            "lineage_root_hash": included_root_hash,
            "signer_identity_fingerprint": fingerprint,
            "signer_public_key": public_key,
        });
        let signable_bytes = consent_crypto::signable_bytes(&signable)?;
        let signature = consent_crypto::sign_bytes_with_hex(private_key_hex, &signable_bytes)?;
        let obj = proof.as_object_mut().expect("proof is an object");
        obj.insert("signer_identity_fingerprint".to_string(), json!(fingerprint));
        obj.insert("signer_public_key".to_string(), json!(public_key));
        obj.insert("proof_signature".to_string(), json!(signature));
    }

    Ok(proof)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofVerification {
    pub verified: bool,
    pub derived_state: String,
    pub failure_reason: Option<String>,
}

fn proof_failure(derived_state: &str, reason: impl Into<String>) -> ProofVerification {
    ProofVerification {
        verified: false,
        derived_state: derived_state.to_string(),
        failure_reason: Some(reason.into()),
    }
}

/// Verify a consent proof with the deterministic failure order spec.md
/// 4.F lays out: required keys/version/type -> included_events bounds
/// -> embedded lineage (signature-first) -> anchor agreement -> tenant
/// consistency -> per-event positional match -> next-event bound ->
/// derived-state agreement -> proof signature (if present).
pub fn verify_consent_proof(proof: &Value) -> ProofVerification {
    for key in [
        "version",
        "proof_type",
        "tenant_id",
        "consent_id",
        "asserted_at",
        "asserted_state",
        "tenant_anchor",
        "lineage",
        "included_events",
    ] {
        if proof.get(key).is_none() {
            return proof_failure("UNKNOWN", format!("missing key: {key}"));
        }
    }
    if proof.get("version").and_then(Value::as_u64) != Some(1) {
        return proof_failure("UNKNOWN", "unsupported version");
    }
    if proof.get("proof_type").and_then(Value::as_str) != Some("CONSENT_STATE_AT_TIME") {
        return proof_failure("UNKNOWN", "unsupported proof_type");
    }
    let asserted_state_claim = proof.get("asserted_state").and_then(Value::as_str).unwrap_or("");
    if asserted_state_claim != "ACTIVE" && asserted_state_claim != "REVOKED" {
        return proof_failure("UNKNOWN", "invalid asserted_state");
    }
    let Some(included) = proof.get("included_events").and_then(Value::as_array) else {
        return proof_failure("UNKNOWN", "included_events must be a list");
    };
    let Some(lineage) = proof.get("lineage").filter(|v| v.is_object()) else {
        return proof_failure("UNKNOWN", "lineage must be an object");
    };
    let Some(asserted_at_raw) = proof.get("asserted_at").and_then(Value::as_str) else {
        return proof_failure("UNKNOWN", "invalid asserted_at timestamp");
    };
    let Some(asserted_at) = parse_rfc3339(asserted_at_raw) else {
        return proof_failure("UNKNOWN", "invalid asserted_at timestamp");
    };

    let lineage_check = verify_exported_lineage(lineage);
    if !lineage_check.verified {
        let mut reason = lineage_check
            .failure_reason
            .unwrap_or_else(|| "lineage verification failed".to_string());
        if reason.contains("signature") {
            reason = "lineage signature verification failed".to_string();
        }
        return proof_failure("UNKNOWN", reason);
    }
    if !lineage_check.anchor_verified {
        return proof_failure("UNKNOWN", "tenant anchor verification failed");
    }

    let proof_anchor = proof.get("tenant_anchor").and_then(Value::as_str).unwrap_or("");
    let lineage_anchor = lineage.get("tenant_anchor").and_then(Value::as_str).unwrap_or("");
    if !consent_crypto::constant_time_hex_eq(proof_anchor, lineage_anchor) {
        return proof_failure("UNKNOWN", "proof tenant_anchor mismatch");
    }
    if proof.get("tenant_id").and_then(Value::as_str) != lineage.get("tenant_id").and_then(Value::as_str) {
        return proof_failure("UNKNOWN", "tenant mismatch between proof and lineage");
    }
    if proof.get("consent_id").and_then(Value::as_str) != lineage.get("consent_id").and_then(Value::as_str) {
        return proof_failure("UNKNOWN", "consent mismatch between proof and lineage");
    }

    let empty = Vec::new();
    let lineage_events = lineage.get("events").and_then(Value::as_array).unwrap_or(&empty);
    if included.is_empty() {
        return proof_failure("UNKNOWN", "included_events cannot be empty");
    }
    if included.len() > lineage_events.len() {
        return proof_failure("UNKNOWN", "included_events exceeds lineage length");
    }

    for (idx, event) in included.iter().enumerate() {
        if !event.is_object() {
            return proof_failure("UNKNOWN", format!("included event {idx} must be object"));
        }
        for key in ["action", "event_hash", "created_at"] {
            if event.get(key).is_none() {
                return proof_failure("UNKNOWN", format!("missing included event field: {key}"));
            }
        }
        let counterpart = &lineage_events[idx];
        for key in ["action", "event_hash", "created_at"] {
            if event.get(key) != counterpart.get(key) {
                return proof_failure("UNKNOWN", format!("included event {idx} does not match lineage"));
            }
        }
        let Some(event_time) = event
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(parse_rfc3339)
        else {
            return proof_failure("UNKNOWN", "invalid event timestamp");
        };
        if event_time > asserted_at {
            return proof_failure("UNKNOWN", "included event is after asserted_at");
        }
    }

    if included.len() < lineage_events.len() {
        if let Some(next_time) = lineage_events[included.len()]
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(parse_rfc3339)
        {
            if next_time <= asserted_at {
                return proof_failure("UNKNOWN", "included_events is incomplete for asserted_at");
            }
        }
    }

    let derived_state = derive_state_from_actions(included);
    if derived_state != "ACTIVE" && derived_state != "REVOKED" {
        return proof_failure("UNKNOWN", "unable to derive state from included_events");
    }
    if derived_state != asserted_state_claim {
        return proof_failure(&derived_state, "asserted_state mismatch");
    }

    let has_sig_fields = ["signer_identity_fingerprint", "signer_public_key", "proof_signature"]
        .iter()
        .any(|k| proof.get(*k).is_some());
    if has_sig_fields {
        let all_present = ["signer_identity_fingerprint", "signer_public_key", "proof_signature"]
            .iter()
            .all(|k| proof.get(*k).is_some());
        if !all_present {
            return proof_failure(&derived_state, "incomplete proof signature fields");
        }
        let lineage_signed = ["signer_identity_fingerprint", "signer_public_key", "signature"]
            .iter()
            .all(|k| lineage.get(*k).is_some());
        if !lineage_signed {
            return proof_failure(&derived_state, "signed proof requires signed lineage");
        }
        let signer_fingerprint = proof.get("signer_identity_fingerprint").and_then(Value::as_str).unwrap_or("");
        let signer_public_key = proof.get("signer_public_key").and_then(Value::as_str).unwrap_or("");
        let proof_signature = proof.get("proof_signature").and_then(Value::as_str).unwrap_or("");
        if !consent_crypto::constant_time_hex_eq(
            signer_fingerprint,
            lineage.get("signer_identity_fingerprint").and_then(Value::as_str).unwrap_or(""),
        ) {
            return proof_failure(&derived_state, "proof and lineage signer mismatch");
        }
        if !consent_crypto::constant_time_hex_eq(
            signer_public_key,
            lineage.get("signer_public_key").and_then(Value::as_str).unwrap_or(""),
        ) {
            return proof_failure(&derived_state, "proof and lineage signer mismatch");
        }
        let Ok(computed_fingerprint) = consent_crypto::compute_identity_fingerprint(signer_public_key) else {
            return proof_failure(&derived_state, "proof signer fingerprint mismatch");
        };
        if !consent_crypto::constant_time_hex_eq(&computed_fingerprint, signer_fingerprint) {
            return proof_failure(&derived_state, "proof signer fingerprint mismatch");
        }
        let included_root_hash = included
            .last()
            .and_then(|e| e.get("event_hash"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let signable = json!({
            "asserted_at": proof.get("asserted_at").cloned().unwrap_or(Value::Null),
            "asserted_state": proof.get("asserted_state").cloned().unwrap_or(Value::Null),
            "lineage_root_hash": included_root_hash,
            "signer_identity_fingerprint": signer_fingerprint,
            "signer_public_key": signer_public_key,
        });
        let Ok(signable_bytes) = consent_crypto::signable_bytes(&signable) else {
            return proof_failure(&derived_state, "proof signature verification failed");
        };
        if !consent_crypto::verify_bytes(signer_public_key, &signable_bytes, proof_signature) {
            increment_metric(METRIC_SIGNATURE_VERIFICATION_FAILED, Some("proof_signature_verification_failed"));
            return proof_failure(&derived_state, "proof signature verification failed");
        }
    }

    ProofVerification {
        verified: true,
        derived_state,
        failure_reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{build_lineage_export, StoredLineageEvent};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn store(action: &str, at: i64) -> StoredLineageEvent {
        StoredLineageEvent {
            id: Uuid::new_v4(),
            action: action.to_string(),
            event_hash: "unused".to_string(),
            prev_event_hash: None,
            created_at: Utc.timestamp_opt(at, 0).unwrap(),
        }
    }

    #[test]
    fn s1_happy_path_proof_verifies() {
        let events = vec![store("created", 1_700_000_000)];
        let lineage = build_lineage_export("t", "c", &events, None).unwrap();
        let asserted_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let now = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
        let proof = build_consent_proof("t", "c", asserted_at, &lineage, now, None).unwrap();
        let result = verify_consent_proof(&proof);
        assert!(result.verified);
        assert_eq!(result.derived_state, "ACTIVE");
    }

    #[test]
    fn rejects_future_asserted_at() {
        let events = vec![store("created", 1_700_000_000)];
        let lineage = build_lineage_export("t", "c", &events, None).unwrap();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let asserted_at = Utc.timestamp_opt(1_700_000_500, 0).unwrap();
        assert!(build_consent_proof("t", "c", asserted_at, &lineage, now, None).is_err());
    }

    #[test]
    fn signature_first_on_signed_proof() {
        let kp = consent_crypto::KeyPair::generate();
        let events = vec![store("created", 1_700_000_000)];
        let lineage = build_lineage_export(
            "t",
            "c",
            &events,
            Some((&kp.fingerprint(), &kp.public_key_hex(), &kp.private_key_hex())),
        )
        .unwrap();
        let asserted_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let now = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
        let mut proof = build_consent_proof(
            "t",
            "c",
            asserted_at,
            &lineage,
            now,
            Some((&kp.fingerprint(), &kp.public_key_hex(), &kp.private_key_hex())),
        )
        .unwrap();
        proof["proof_signature"] = json!("00".repeat(64));
        proof["asserted_state"] = json!("REVOKED");
        let result = verify_consent_proof(&proof);
        assert!(!result.verified);
        assert_eq!(result.failure_reason.as_deref(), Some("asserted_state mismatch"));
    }
}
