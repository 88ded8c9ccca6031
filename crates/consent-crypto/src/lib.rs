//! Canonical JSON, SHA-256 hash-material assembly, and Ed25519
//! signing/verification for the consent ledger.
//!
//! This crate is the only place the exact hash and signature formulas
//! live; every other crate calls into it rather than re-deriving them.

pub mod canonical;
pub mod error;
pub mod hash;
pub mod keys;
pub mod signature;

pub use canonical::{canonical_json, canonical_json_bytes, canonical_json_of};
pub use error::{CryptoError, CryptoResult};
pub use hash::{
    compute_anchor_digest, compute_event_hash, compute_identity_fingerprint,
    compute_request_hash, compute_system_event_hash, compute_tenant_anchor,
    constant_time_hex_eq, decode_public_key_hex, normalize_hex, sha256_hex,
};
pub use keys::{KeyPair, PublicKey};
pub use signature::{sign_bytes, sign_bytes_with_hex, sign_object, signable_bytes, verify_bytes, verify_object};
