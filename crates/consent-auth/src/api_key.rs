//! Tenant API-key authentication, grounded on
//! `openibank-auth::api_key`'s HMAC-SHA256 hashing/header-extraction
//! shape, narrowed to the consent ledger's bearer-token scheme (no
//! request signing — the key itself is the bearer credential).

use std::sync::Arc;

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use consent_db::{repos::ApiKeyRepo, models::DbApiKey, Database};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct ApiKeyService {
    repo: Arc<ApiKeyRepo>,
    hash_secret: String,
}

impl ApiKeyService {
    pub fn new(db: &Database, config: &AuthConfig) -> Self {
        Self {
            repo: Arc::new(db.api_key_repo()),
            hash_secret: config.api_key_hash_secret.clone(),
        }
    }

    /// Generate a fresh random raw API key (32 bytes, hex-encoded).
    pub fn generate_raw_key(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// HMAC-SHA256 the raw key under the server secret; this is what's
    /// stored and compared, never the raw key itself.
    pub fn hash_key(&self, raw_key: &str) -> AuthResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.hash_secret.as_bytes())
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        mac.update(raw_key.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Resolve a raw bearer credential to its active API key row.
    pub async fn authenticate(&self, raw_key: &str) -> AuthResult<DbApiKey> {
        let key_hash = self.hash_key(raw_key)?;
        let row = self
            .repo
            .find_active_by_hash(&key_hash)
            .await
            .map_err(AuthError::from)?;
        row.ok_or(AuthError::Invalid)
    }
}

/// `Authorization: Bearer <api_key>` (primary) or `X-Api-Key` (fallback).
pub fn extract_raw_api_key(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(value) = auth.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }
    headers
        .get("X-Api-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> String {
        "test-hash-secret".to_string()
    }

    #[test]
    fn hashing_is_deterministic() {
        let mac1 = {
            let mut mac = HmacSha256::new_from_slice(test_secret().as_bytes()).unwrap();
            mac.update(b"raw-key");
            hex::encode(mac.finalize().into_bytes())
        };
        let mac2 = {
            let mut mac = HmacSha256::new_from_slice(test_secret().as_bytes()).unwrap();
            mac.update(b"raw-key");
            hex::encode(mac.finalize().into_bytes())
        };
        assert_eq!(mac1, mac2);
    }

    #[test]
    fn extracts_bearer_before_fallback_header() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        headers.insert("X-Api-Key", "other".parse().unwrap());
        assert_eq!(extract_raw_api_key(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn falls_back_to_x_api_key_header() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("X-Api-Key", "fallback-key".parse().unwrap());
        assert_eq!(extract_raw_api_key(&headers), Some("fallback-key".to_string()));
    }

    #[test]
    fn missing_credentials_returns_none() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(extract_raw_api_key(&headers), None);
    }
}
