//! Idempotency-key replay/conflict decision.
//!
//! Grounded on `core/idempotency.py`. Request-hash computation itself
//! lives in `consent-crypto::compute_request_hash`; this module holds
//! the pure decision over an already-fetched stored row.

use crate::error::CoreResult;

#[derive(Debug, Clone)]
pub struct StoredIdempotencyRow {
    pub request_hash: String,
    pub response_body: serde_json::Value,
    pub response_status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyDecision {
    /// No row existed yet — the caller should execute the operation and
    /// store the result under this key.
    Fresh,
    /// A row existed with a matching `request_hash` — replay its stored
    /// response verbatim without re-executing the operation.
    Replay,
    /// A row existed with a different `request_hash` — the same key was
    /// reused for a different request body; reject with 409.
    Conflict,
}

/// `request_hash = sha256(f"{METHOD}|{path}|{canonical_json(body)}")`.
pub fn compute_request_hash(method: &str, path: &str, body: &serde_json::Value) -> CoreResult<String> {
    Ok(consent_crypto::compute_request_hash(method, path, body)?)
}

/// Decide replay vs. conflict vs. fresh, given the row already looked
/// up by `(tenant_id, idempotency_key)` (or `None` if no row exists).
pub fn decide(
    existing: Option<&StoredIdempotencyRow>,
    computed_request_hash: &str,
) -> IdempotencyDecision {
    let Some(row) = existing else {
        return IdempotencyDecision::Fresh;
    };
    if consent_crypto::constant_time_hex_eq(&row.request_hash, computed_request_hash) {
        IdempotencyDecision::Replay
    } else {
        IdempotencyDecision::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_key_is_fresh() {
        assert_eq!(decide(None, "h"), IdempotencyDecision::Fresh);
    }

    #[test]
    fn matching_hash_replays() {
        let hash = compute_request_hash("POST", "/consents", &json!({"a": 1})).unwrap();
        let row = StoredIdempotencyRow {
            request_hash: hash.clone(),
            response_body: json!({"ok": true}),
            response_status: 201,
        };
        assert_eq!(decide(Some(&row), &hash), IdempotencyDecision::Replay);
    }

    #[test]
    fn mismatched_hash_conflicts() {
        let hash_a = compute_request_hash("POST", "/consents", &json!({"a": 1})).unwrap();
        let hash_b = compute_request_hash("POST", "/consents", &json!({"a": 2})).unwrap();
        let row = StoredIdempotencyRow {
            request_hash: hash_a,
            response_body: json!({"ok": true}),
            response_status: 201,
        };
        assert_eq!(decide(Some(&row), &hash_b), IdempotencyDecision::Conflict);
    }
}
