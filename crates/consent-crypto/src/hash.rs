//! SHA-256 hash-material assembly for every chain in the system.
//!
//! Each function below assembles its exact pipe-delimited material and
//! hashes it; callers never build the material string themselves, so
//! the formula lives in exactly one place per hash family.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::canonical::canonical_json;
use crate::error::{CryptoError, CryptoResult};

/// SHA-256 hex digest of raw bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Event-hash material for a consent lineage event:
/// `sha256(tenant_id | "|" | consent_id | "|" | action | "|" | canonical_json(payload) | "|" | prev_hash_or_empty)`.
pub fn compute_event_hash(
    tenant_id: &str,
    consent_id: &str,
    action: &str,
    payload: &serde_json::Value,
    prev_hash: Option<&str>,
) -> CryptoResult<String> {
    let material = format!(
        "{tenant_id}|{consent_id}|{action}|{}|{}",
        canonical_json(payload)?,
        prev_hash.unwrap_or("")
    );
    Ok(sha256_hex(material.as_bytes()))
}

/// System-event-hash material:
/// `sha256("SYSTEM|" | event_type | "|" | tenant_id_or_empty | "|" | resource_type_or_empty | "|" | resource_id_or_empty | "|" | canonical_json(payload) | "|" | prev_hash_or_empty)`.
pub fn compute_system_event_hash(
    event_type: &str,
    tenant_id: Option<&str>,
    resource_type: Option<&str>,
    resource_id: Option<&str>,
    payload: &serde_json::Value,
    prev_hash: Option<&str>,
) -> CryptoResult<String> {
    let material = format!(
        "SYSTEM|{event_type}|{}|{}|{}|{}|{}",
        tenant_id.unwrap_or(""),
        resource_type.unwrap_or(""),
        resource_id.unwrap_or(""),
        canonical_json(payload)?,
        prev_hash.unwrap_or("")
    );
    Ok(sha256_hex(material.as_bytes()))
}

/// Tenant anchor: `sha256("ANCHOR|" | tenant_id | "|" | lineage_root_hash)`.
pub fn compute_tenant_anchor(tenant_id: &str, lineage_root_hash: &str) -> String {
    let material = format!("ANCHOR|{tenant_id}|{lineage_root_hash}");
    sha256_hex(material.as_bytes())
}

/// External anchor digest: SHA-256 over the pre-sorted anchor list
/// joined with `\n`.
pub fn compute_anchor_digest(sorted_anchors: &[String]) -> String {
    let material = sorted_anchors.join("\n");
    sha256_hex(material.as_bytes())
}

/// Idempotency request hash: `sha256(UPPER(method) | "|" | path | "|" | canonical_json(body))`.
pub fn compute_request_hash(
    method: &str,
    path: &str,
    body: &serde_json::Value,
) -> CryptoResult<String> {
    let material = format!("{}|{path}|{}", method.to_uppercase(), canonical_json(body)?);
    Ok(sha256_hex(material.as_bytes()))
}

/// Identity fingerprint: SHA-256 of the raw 32-byte public key.
pub fn compute_identity_fingerprint(public_key_hex: &str) -> CryptoResult<String> {
    let raw = decode_public_key_hex(public_key_hex)?;
    Ok(sha256_hex(&raw))
}

/// Validate and decode a public key hex string. Must decode to exactly
/// 32 bytes; accepts upper/lower/mixed case hex on input.
pub fn decode_public_key_hex(public_key_hex: &str) -> CryptoResult<[u8; 32]> {
    if public_key_hex.len() != 64 {
        return Err(CryptoError::InvalidHex(
            "public_key must be 32 bytes encoded as 64 hex characters".to_string(),
        ));
    }
    let raw = hex::decode(public_key_hex)
        .map_err(|e| CryptoError::InvalidHex(format!("public_key must be valid hex: {e}")))?;
    raw.try_into()
        .map_err(|_| CryptoError::InvalidHex("public_key must decode to exactly 32 bytes".to_string()))
}

/// Normalize a hex string to lowercase, validating it is well-formed
/// hex of even length. Output hashes/signatures are always lowercase;
/// input may be any case.
pub fn normalize_hex(value: &str) -> CryptoResult<String> {
    if value.len() % 2 != 0 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CryptoError::InvalidHex(format!("not valid hex: {value}")));
    }
    Ok(value.to_lowercase())
}

/// Constant-time hex-string equality. Every security-relevant hash or
/// signature comparison must go through this, never `==`.
pub fn constant_time_hex_eq(a: &str, b: &str) -> bool {
    let (Ok(a), Ok(b)) = (normalize_hex(a), normalize_hex(b)) else {
        return false;
    };
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frozen_event_hash_vector() {
        let h = compute_event_hash("t", "c", "created", &json!({}), None).unwrap();
        assert_eq!(
            h,
            "add0bc7b3376b67b13d04e96d6bb89e717f5c62ddc3b972bb349fdc8cce69a2b"
        );
    }

    #[test]
    fn frozen_tenant_anchor_vector() {
        let h = compute_tenant_anchor("tenant-1", &"a".repeat(64));
        assert_eq!(
            h,
            "a13e2793c9b48461b84689417e3ff76db66c8d1b597ab7cff88ebbfbca8e821f"
        );
    }

    #[test]
    fn frozen_anchor_digest_vector() {
        let mut anchors = vec!["b".repeat(64), "a".repeat(64)];
        anchors.sort();
        let h = compute_anchor_digest(&anchors);
        assert_eq!(
            h,
            "5e9ae866add9a85d69c3481d059bb9f158a39e5670ba11f95112fc409630894e"
        );
    }

    #[test]
    fn constant_time_eq_is_case_insensitive() {
        assert!(constant_time_hex_eq("AbCd", "abcd"));
        assert!(!constant_time_hex_eq("abcd", "abce"));
    }

    #[test]
    fn rejects_short_public_key() {
        assert!(decode_public_key_hex("abcd").is_err());
    }
}
