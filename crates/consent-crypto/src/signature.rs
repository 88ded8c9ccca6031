//! Deterministic sign/verify over canonical JSON bytes.
//!
//! Grounded on `openibank-crypto::signature`'s `Signable` trait, adapted
//! so the message is always the canonical JSON of the object with any
//! `signature`-named field removed — the `signable_bytes(obj)`
//! operation spec.md 4.B requires.

use ed25519_dalek::{Signature, Signer, Verifier};
use serde_json::Value;

use crate::canonical::canonical_json;
use crate::error::CryptoResult;
use crate::hash::{decode_public_key_hex, normalize_hex};
use crate::keys::KeyPair;

/// Remove `signature`-named fields and return the canonical JSON bytes
/// to sign or verify.
pub fn signable_bytes(value: &Value) -> CryptoResult<Vec<u8>> {
    let mut trimmed = value.clone();
    if let Value::Object(map) = &mut trimmed {
        map.remove("signature");
        map.remove("proof_signature");
    }
    Ok(canonical_json(&trimmed)?.into_bytes())
}

/// Sign arbitrary message bytes, returning a lowercase hex signature.
pub fn sign_bytes(keypair: &KeyPair, message: &[u8]) -> String {
    let sig: Signature = keypair.signing_key().sign(message);
    hex::encode(sig.to_bytes())
}

/// Sign arbitrary message bytes with a raw private-key hex, mirroring
/// `lineage_signing.sign_bytes` for callers that only hold a secret hex
/// string (never persisted, never logged).
pub fn sign_bytes_with_hex(private_key_hex: &str, message: &[u8]) -> CryptoResult<String> {
    let keypair = KeyPair::from_hex(private_key_hex)?;
    Ok(sign_bytes(&keypair, message))
}

/// Verify a signature over message bytes under a hex-encoded public key.
/// Fails closed on any parse error, length mismatch, or cryptographic
/// rejection - never panics, never throws on malformed input.
pub fn verify_bytes(public_key_hex: &str, message: &[u8], signature_hex: &str) -> bool {
    let Ok(normalized_sig) = normalize_hex(signature_hex) else {
        return false;
    };
    let Ok(raw_pub) = decode_public_key_hex(public_key_hex) else {
        return false;
    };
    let Ok(verifying_key) = ed25519_dalek::VerifyingKey::from_bytes(&raw_pub) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(&normalized_sig) else {
        return false;
    };
    let Ok(sig_array): Result<[u8; 64], _> = sig_bytes.try_into() else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_array);
    verifying_key.verify(message, &signature).is_ok()
}

/// Sign a JSON object via its `signable_bytes` form.
pub fn sign_object(keypair: &KeyPair, value: &Value) -> CryptoResult<String> {
    Ok(sign_bytes(keypair, &signable_bytes(value)?))
}

/// Verify a JSON object's signature via its `signable_bytes` form.
pub fn verify_object(public_key_hex: &str, value: &Value, signature_hex: &str) -> CryptoResult<bool> {
    Ok(verify_bytes(public_key_hex, &signable_bytes(value)?, signature_hex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sign_then_verify_round_trips() {
        let kp = KeyPair::generate();
        let msg = b"hello consent ledger";
        let sig = sign_bytes(&kp, msg);
        assert!(verify_bytes(&kp.public_key_hex(), msg, &sig));
    }

    #[test]
    fn verify_fails_on_tampered_message() {
        let kp = KeyPair::generate();
        let sig = sign_bytes(&kp, b"original");
        assert!(!verify_bytes(&kp.public_key_hex(), b"tampered", &sig));
    }

    #[test]
    fn verify_fails_closed_on_malformed_signature() {
        let kp = KeyPair::generate();
        assert!(!verify_bytes(&kp.public_key_hex(), b"x", "not-hex"));
        assert!(!verify_bytes(&kp.public_key_hex(), b"x", "ab"));
    }

    #[test]
    fn signable_bytes_strips_signature_field() {
        let kp = KeyPair::generate();
        let obj = json!({"a": 1, "signature": "deadbeef"});
        let sig = sign_object(&kp, &obj).unwrap();
        assert!(verify_object(&kp.public_key_hex(), &obj, &sig).unwrap());

        let mut obj2 = obj.clone();
        obj2["signature"] = json!("different-but-irrelevant");
        assert!(verify_object(&kp.public_key_hex(), &obj2, &sig).unwrap());
    }
}
