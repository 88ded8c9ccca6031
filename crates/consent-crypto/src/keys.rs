//! Ed25519 key material.
//!
//! Private key bytes are only ever handed to a signer operation; this
//! module exposes no persistence or logging path for them.

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::{CryptoError, CryptoResult};
use crate::hash::{compute_identity_fingerprint, decode_public_key_hex};

/// An Ed25519 keypair. `signing_key` is intentionally not `pub` outside
/// this module — callers get hex accessors, never the raw struct field.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Reconstruct a keypair from 32 raw private key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    /// Reconstruct a keypair from a hex-encoded 32-byte private key.
    pub fn from_hex(private_key_hex: &str) -> CryptoResult<Self> {
        let raw = decode_public_key_hex(private_key_hex)?;
        Ok(Self::from_bytes(&raw))
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn fingerprint(&self) -> String {
        compute_identity_fingerprint(&self.public_key_hex())
            .expect("keypair always holds a valid 32-byte public key")
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

/// A standalone Ed25519 public key, validated to decode to 32 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(String);

impl PublicKey {
    pub fn from_hex(hex_str: &str) -> CryptoResult<Self> {
        decode_public_key_hex(hex_str)?;
        Ok(Self(hex_str.to_lowercase()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    pub fn fingerprint(&self) -> String {
        compute_identity_fingerprint(&self.0).expect("validated on construction")
    }

    pub fn to_verifying_key(&self) -> CryptoResult<VerifyingKey> {
        let raw = decode_public_key_hex(&self.0)?;
        VerifyingKey::from_bytes(&raw)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keypair_round_trips_through_hex() {
        let kp = KeyPair::generate();
        let hex = kp.private_key_hex();
        let kp2 = KeyPair::from_hex(&hex).unwrap();
        assert_eq!(kp.public_key_hex(), kp2.public_key_hex());
    }

    #[test]
    fn fingerprint_is_sha256_of_raw_public_key() {
        let kp = KeyPair::generate();
        let expected = compute_identity_fingerprint(&kp.public_key_hex()).unwrap();
        assert_eq!(kp.fingerprint(), expected);
    }

    #[test]
    fn public_key_rejects_bad_length() {
        assert!(PublicKey::from_hex("ab").is_err());
    }
}
