//! Process-wide system event ledger.
//!
//! Grounded on `core/system_events.py` (tip discipline),
//! `core/system_lineage.py` (hash material + chain verification), and
//! `core/system_forensics.py` (forensic export re-linking). The
//! transactional tip lookup against storage lives in `consent-db`;
//! this module holds the pure selection-among-candidates and
//! hash/verify math.

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::error::CoreResult;

/// `payload_hash = sha256(canonical_json(payload))`. The payload itself
/// is never persisted — only this digest is.
pub fn compute_payload_hash(payload: &serde_json::Value) -> CoreResult<String> {
    Ok(consent_crypto::sha256_hex(
        consent_crypto::canonical_json(payload)?.as_bytes(),
    ))
}

/// `event_hash` is computed over `{"payload_hash": payload_hash}`, not
/// over the original payload, so verification never needs it back.
pub fn compute_system_event_hash(
    event_type: &str,
    tenant_id: Option<&str>,
    resource_type: Option<&str>,
    resource_id: Option<&str>,
    payload_hash: &str,
    prev_hash: Option<&str>,
) -> CoreResult<String> {
    Ok(consent_crypto::compute_system_event_hash(
        event_type,
        tenant_id,
        resource_type,
        resource_id,
        &json!({ "payload_hash": payload_hash }),
        prev_hash,
    )?)
}

/// A candidate row for tip selection: either a row still pending in the
/// active transaction, or one already committed.
#[derive(Debug, Clone)]
pub struct TipCandidate {
    pub id: Uuid,
    pub event_hash: String,
    pub prev_event_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pick the tip among *pending* (uncommitted-in-this-transaction) rows:
/// the tip is whichever pending row's `event_hash` is not referenced as
/// any other pending row's `prev_event_hash`. Ties (or no tip found
/// among pending rows at all — an empty slice) fall back to the full
/// pending set, tie-broken by `(created_at, id)` descending. Returns
/// `None` when `pending` is empty, signaling the caller should fall
/// back to a committed-row scan.
pub fn select_pending_tip(pending: &[TipCandidate]) -> Option<&TipCandidate> {
    if pending.is_empty() {
        return None;
    }
    let referenced: std::collections::HashSet<&str> = pending
        .iter()
        .filter_map(|row| row.prev_event_hash.as_deref())
        .collect();
    let tips: Vec<&TipCandidate> = pending
        .iter()
        .filter(|row| !referenced.contains(row.event_hash.as_str()))
        .collect();
    let source = if tips.is_empty() { pending.iter().collect() } else { tips };
    source
        .into_iter()
        .max_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemChainVerification {
    pub verified: bool,
    pub failure_index: Option<usize>,
    pub failure_reason: Option<String>,
}

/// One row as read back for chain verification (payload is not needed
/// — only its hash is part of the chain).
#[derive(Debug, Clone)]
pub struct SystemEventRecord {
    pub event_type: String,
    pub tenant_id: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub payload_hash: String,
    pub prev_event_hash: Option<String>,
    pub event_hash: String,
}

/// Replay the entire system event chain from the beginning, recomputing
/// every hash and checking `prev_event_hash` continuity.
pub fn verify_system_chain(events: &[SystemEventRecord]) -> SystemChainVerification {
    let mut prev_hash: Option<String> = None;
    for (idx, event) in events.iter().enumerate() {
        if event.prev_event_hash != prev_hash {
            return SystemChainVerification {
                verified: false,
                failure_index: Some(idx),
                failure_reason: Some("prev_hash continuity failure".to_string()),
            };
        }
        let Ok(expected) = compute_system_event_hash(
            &event.event_type,
            event.tenant_id.as_deref(),
            event.resource_type.as_deref(),
            event.resource_id.as_deref(),
            &event.payload_hash,
            prev_hash.as_deref(),
        ) else {
            return SystemChainVerification {
                verified: false,
                failure_index: Some(idx),
                failure_reason: Some("event_hash mismatch".to_string()),
            };
        };
        if !consent_crypto::constant_time_hex_eq(&event.event_hash, &expected) {
            return SystemChainVerification {
                verified: false,
                failure_index: Some(idx),
                failure_reason: Some("event_hash mismatch".to_string()),
            };
        }
        prev_hash = Some(event.event_hash.clone());
    }
    SystemChainVerification {
        verified: true,
        failure_index: None,
        failure_reason: None,
    }
}

/// Re-link forensic-export rows by prev-hash pointer starting from the
/// null predecessor, falling back to the given raw (insertion) order if
/// the pointer graph does not linearize — a deliberate tamper signal
/// the subsequent `verify_system_chain` call will catch.
pub fn relink_system_events<'a>(raw: &'a [SystemEventRecord], ids: &'a [Uuid]) -> Vec<&'a SystemEventRecord> {
    use std::collections::HashMap;
    let mut by_prev: HashMap<Option<String>, usize> = HashMap::new();
    for (i, event) in raw.iter().enumerate() {
        by_prev.insert(event.prev_event_hash.clone(), i);
    }
    let mut ordered = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut current = by_prev.get(&None).copied();
    while let Some(i) = current {
        if !seen.insert(ids[i]) {
            break;
        }
        ordered.push(&raw[i]);
        current = by_prev.get(&Some(raw[i].event_hash.clone())).copied();
    }
    if ordered.len() != raw.len() {
        return raw.iter().collect();
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: Uuid, hash: &str, prev: Option<&str>, at: i64) -> TipCandidate {
        TipCandidate {
            id,
            event_hash: hash.to_string(),
            prev_event_hash: prev.map(str::to_string),
            created_at: chrono::TimeZone::timestamp_opt(&Utc, at, 0).unwrap(),
        }
    }

    #[test]
    fn selects_untargeted_row_as_tip() {
        let a = candidate(Uuid::new_v4(), "h1", None, 1);
        let b = candidate(Uuid::new_v4(), "h2", Some("h1"), 2);
        let tip = select_pending_tip(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(tip.event_hash, "h2");
    }

    #[test]
    fn empty_pending_returns_none() {
        assert!(select_pending_tip(&[]).is_none());
    }

    #[test]
    fn s4_chain_integrity_tamper_detected() {
        let mut events = Vec::new();
        let mut prev: Option<String> = None;
        for i in 0..3 {
            let payload_hash = compute_payload_hash(&json!({"i": i})).unwrap();
            let hash = compute_system_event_hash(
                "tenant.created",
                Some("t"),
                None,
                None,
                &payload_hash,
                prev.as_deref(),
            )
            .unwrap();
            events.push(SystemEventRecord {
                event_type: "tenant.created".to_string(),
                tenant_id: Some("t".to_string()),
                resource_type: None,
                resource_id: None,
                payload_hash,
                prev_event_hash: prev.clone(),
                event_hash: hash.clone(),
            });
            prev = Some(hash);
        }
        assert!(verify_system_chain(&events).verified);

        events[1].event_hash = "0".repeat(64);
        let result = verify_system_chain(&events);
        assert!(!result.verified);
        assert_eq!(result.failure_index, Some(1));
    }
}
