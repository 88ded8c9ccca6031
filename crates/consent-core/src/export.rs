//! Lineage export artifact: build and verify.
//!
//! Grounded on `core/lineage_export.py` and `core/lineage_verify.py`
//! (`verify_exported_lineage`). Artifacts are represented as
//! `serde_json::Value` on the verify side because the wire format is
//! untyped JSON handed to us with no schema guarantee — exactly what
//! the Python original checks key-by-key before trusting anything.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::observability::{increment_metric, METRIC_SIGNATURE_VERIFICATION_FAILED};

/// One raw lineage event as read from storage, in append order.
#[derive(Debug, Clone)]
pub struct StoredLineageEvent {
    pub id: uuid::Uuid,
    pub action: String,
    pub event_hash: String,
    pub prev_event_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn rfc3339z(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Re-link stored events by prev-hash pointer starting from the null
/// predecessor. If the prev-hash graph cannot be linearized (a broken
/// or forked chain), falls back to insertion order — which then fails
/// verification, which is the intended tamper signal.
fn relink_by_prev_hash(raw_events: &[StoredLineageEvent]) -> Vec<&StoredLineageEvent> {
    use std::collections::HashMap;
    let mut by_prev: HashMap<Option<String>, &StoredLineageEvent> = HashMap::new();
    for event in raw_events {
        by_prev.insert(event.prev_event_hash.clone(), event);
    }
    let mut ordered = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut current = by_prev.get(&None).copied();
    while let Some(event) = current {
        if !seen.insert(event.id) {
            break;
        }
        ordered.push(event);
        current = by_prev.get(&Some(event.event_hash.clone())).copied();
    }
    if ordered.len() != raw_events.len() {
        return raw_events.iter().collect();
    }
    ordered
}

/// Build the export artifact. `raw_events` must already be ordered by
/// `(created_at asc, id asc)` as fetched from storage; this function
/// re-links them by prev-hash and recomputes every `event_hash` with an
/// **empty payload** (the public-hash form), so the export reveals no
/// payload content while remaining chain-verifiable.
pub fn build_lineage_export(
    tenant_id: &str,
    consent_id: &str,
    raw_events: &[StoredLineageEvent],
    signer: Option<(&str, &str, &str)>,
) -> CoreResult<Value> {
    let ordered = relink_by_prev_hash(raw_events);

    let mut export_events = Vec::with_capacity(ordered.len());
    let mut prev_hash: Option<String> = None;
    for event in &ordered {
        let public_hash = consent_crypto::compute_event_hash(
            tenant_id,
            consent_id,
            &event.action,
            &json!({}),
            prev_hash.as_deref(),
        )?;
        export_events.push(json!({
            "action": event.action,
            "event_hash": public_hash,
            "prev_event_hash": prev_hash,
            "created_at": rfc3339z(event.created_at),
        }));
        prev_hash = Some(public_hash);
    }

    let lineage_root_hash = prev_hash.clone().unwrap_or_default();
    let tenant_anchor = consent_crypto::compute_tenant_anchor(tenant_id, &lineage_root_hash);

    let mut export_obj = json!({
        "version": 1,
        "tenant_id": tenant_id,
        "consent_id": consent_id,
        "algorithm": "SHA256",
        "canonicalization": "sorted-json-no-whitespace",
        "tenant_anchor": tenant_anchor,
        "events": export_events,
    });

    if let Some((fingerprint, public_key, private_key_hex)) = signer {
        let computed = consent_crypto::compute_identity_fingerprint(public_key)?;
        if computed != fingerprint {
            return Err(CoreError::Validation(
                "signer public key does not match signer_identity_fingerprint".to_string(),
            ));
        }
        let obj = export_obj.as_object_mut().expect("export_obj is an object");
        obj.insert("signer_identity_fingerprint".to_string(), json!(fingerprint));
        obj.insert("signer_public_key".to_string(), json!(public_key));
        let signable_bytes = consent_crypto::signable_bytes(&export_obj)?;
        let signature = consent_crypto::sign_bytes_with_hex(private_key_hex, &signable_bytes)?;
        export_obj
            .as_object_mut()
            .expect("export_obj is an object")
            .insert("signature".to_string(), json!(signature));
    }

    Ok(export_obj)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageVerification {
    pub verified: bool,
    pub failure_index: Option<usize>,
    pub failure_reason: Option<String>,
    pub anchor_verified: bool,
}

fn lineage_failure(index: Option<usize>, reason: impl Into<String>) -> LineageVerification {
    let reason = reason.into();
    if reason.contains("signature") {
        increment_metric(METRIC_SIGNATURE_VERIFICATION_FAILED, Some(&reason));
    }
    LineageVerification {
        verified: false,
        failure_index: index,
        failure_reason: Some(reason),
        anchor_verified: false,
    }
}

fn str_field<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// Verify an exported lineage artifact. Signature checks run *before*
/// structural/hash checks (spec.md invariant 9 "signature-first
/// failure") so a signed-but-tampered export reports the signature
/// failure rather than a hash mismatch.
pub fn verify_exported_lineage(export: &Value) -> LineageVerification {
    let has_sig_fields = ["signer_identity_fingerprint", "signer_public_key", "signature"]
        .iter()
        .any(|k| export.get(*k).is_some());

    if has_sig_fields {
        let all_present = ["signer_identity_fingerprint", "signer_public_key", "signature"]
            .iter()
            .all(|k| export.get(*k).is_some());
        if !all_present {
            return lineage_failure(None, "incomplete lineage signature fields");
        }
        let Some(signer_fingerprint) = str_field(export, "signer_identity_fingerprint") else {
            return lineage_failure(None, "incomplete lineage signature fields");
        };
        let Some(signer_public_key) = str_field(export, "signer_public_key") else {
            return lineage_failure(None, "incomplete lineage signature fields");
        };
        let Some(signature) = str_field(export, "signature") else {
            return lineage_failure(None, "incomplete lineage signature fields");
        };
        let Ok(computed_fingerprint) = consent_crypto::compute_identity_fingerprint(signer_public_key)
        else {
            return lineage_failure(None, "lineage signer fingerprint mismatch");
        };
        if !consent_crypto::constant_time_hex_eq(&computed_fingerprint, signer_fingerprint) {
            return lineage_failure(None, "lineage signer fingerprint mismatch");
        }
        let mut signable = export.clone();
        if let Some(obj) = signable.as_object_mut() {
            obj.remove("signature");
        }
        let Ok(signable_bytes) = consent_crypto::signable_bytes(&signable) else {
            return lineage_failure(None, "lineage signature verification failed");
        };
        if !consent_crypto::verify_bytes(signer_public_key, &signable_bytes, signature) {
            return lineage_failure(None, "lineage signature verification failed");
        }
    }

    for key in [
        "version",
        "tenant_id",
        "consent_id",
        "algorithm",
        "canonicalization",
        "tenant_anchor",
        "events",
    ] {
        if export.get(key).is_none() {
            return lineage_failure(None, format!("missing key: {key}"));
        }
    }
    if export.get("version").and_then(Value::as_u64) != Some(1) {
        return lineage_failure(None, "unsupported version");
    }
    if str_field(export, "algorithm") != Some("SHA256") {
        return lineage_failure(None, "unsupported algorithm");
    }
    if str_field(export, "canonicalization") != Some("sorted-json-no-whitespace") {
        return lineage_failure(None, "unsupported canonicalization");
    }
    let Some(events) = export.get("events").and_then(Value::as_array) else {
        return lineage_failure(None, "events must be a list");
    };

    let tenant_id = str_field(export, "tenant_id").unwrap_or_default().to_string();
    let consent_id = str_field(export, "consent_id").unwrap_or_default().to_string();
    let mut prev_hash: Option<String> = None;

    for (idx, event) in events.iter().enumerate() {
        if !event.is_object() {
            return lineage_failure(Some(idx), "event must be an object");
        }
        for key in ["action", "event_hash", "prev_event_hash", "created_at"] {
            if event.get(key).is_none() {
                return lineage_failure(Some(idx), format!("missing event field: {key}"));
            }
        }
        let action = str_field(event, "action").unwrap_or_default();
        let Some(event_hash) = str_field(event, "event_hash") else {
            return lineage_failure(Some(idx), "event_hash must be a 64-character hex string");
        };
        if event_hash.len() != 64 {
            return lineage_failure(Some(idx), "event_hash must be a 64-character hex string");
        }
        let event_prev = event.get("prev_event_hash").filter(|v| !v.is_null());
        if let Some(v) = event_prev {
            let Some(s) = v.as_str() else {
                return lineage_failure(Some(idx), "prev_event_hash must be string or null");
            };
            if s.len() != 64 {
                return lineage_failure(Some(idx), "prev_event_hash must be a 64-character hex string");
            }
        }
        let event_prev_str = event_prev.and_then(Value::as_str).map(str::to_string);
        if event_prev_str != prev_hash {
            return lineage_failure(Some(idx), "prev_event_hash does not match chain");
        }

        let Ok(expected_hash) = consent_crypto::compute_event_hash(
            &tenant_id,
            &consent_id,
            action,
            &json!({}),
            prev_hash.as_deref(),
        ) else {
            return lineage_failure(Some(idx), "event_hash mismatch");
        };
        if !consent_crypto::constant_time_hex_eq(&expected_hash, event_hash) {
            return lineage_failure(Some(idx), "event_hash mismatch");
        }
        prev_hash = Some(event_hash.to_string());
    }

    let expected_anchor = consent_crypto::compute_tenant_anchor(&tenant_id, prev_hash.as_deref().unwrap_or(""));
    let claimed_anchor = str_field(export, "tenant_anchor").unwrap_or_default();
    if !consent_crypto::constant_time_hex_eq(claimed_anchor, &expected_anchor) {
        return lineage_failure(None, "tenant_anchor mismatch");
    }

    LineageVerification {
        verified: true,
        failure_index: None,
        failure_reason: None,
        anchor_verified: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn store(action: &str, event_hash: &str, prev: Option<&str>, at: i64) -> StoredLineageEvent {
        StoredLineageEvent {
            id: Uuid::new_v4(),
            action: action.to_string(),
            event_hash: event_hash.to_string(),
            prev_event_hash: prev.map(str::to_string),
            created_at: chrono::TimeZone::timestamp_opt(&Utc, at, 0).unwrap(),
        }
    }

    #[test]
    fn build_then_verify_round_trips() {
        let events = vec![store("created", "irrelevant-stored-hash", None, 1_700_000_000)];
        let export = build_lineage_export("t", "c", &events, None).unwrap();
        let result = verify_exported_lineage(&export);
        assert!(result.verified);
        assert!(result.anchor_verified);
    }

    #[test]
    fn tamper_on_event_hash_fails() {
        let events = vec![store("created", "x", None, 1_700_000_000)];
        let mut export = build_lineage_export("t", "c", &events, None).unwrap();
        export["events"][0]["event_hash"] = json!("0".repeat(64));
        let result = verify_exported_lineage(&export);
        assert!(!result.verified);
        assert_eq!(result.failure_index, Some(0));
    }

    #[test]
    fn signed_export_with_bad_signature_reports_signature_failure_first() {
        let kp = consent_crypto::KeyPair::generate();
        let events = vec![store("created", "x", None, 1_700_000_000)];
        let mut export = build_lineage_export(
            "t",
            "c",
            &events,
            Some((&kp.fingerprint(), &kp.public_key_hex(), &kp.private_key_hex())),
        )
        .unwrap();
        // Corrupt both the signature and (if it were checked first) a hash.
        export["signature"] = json!("00".repeat(64));
        export["events"][0]["event_hash"] = json!("11".repeat(32));
        let result = verify_exported_lineage(&export);
        assert!(!result.verified);
        assert_eq!(
            result.failure_reason.as_deref(),
            Some("lineage signature verification failed")
        );
    }
}
