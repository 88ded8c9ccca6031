//! Admin authentication: a distinct namespace from tenant API keys
//! (`X-Admin-Api-Key`), grounded on teacher's `RequireAdmin` extractor
//! pattern but backed by a single configured credential rather than a
//! user table.

use subtle::ConstantTimeEq;

use crate::config::AuthConfig;
use crate::error::AuthError;

#[derive(Clone)]
pub struct AdminAuth {
    admin_api_key: String,
}

impl AdminAuth {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            admin_api_key: config.admin_api_key.clone(),
        }
    }

    pub fn verify(&self, provided: Option<&str>) -> Result<(), AuthError> {
        let Some(provided) = provided else {
            return Err(AuthError::Missing);
        };
        if self.admin_api_key.is_empty() {
            return Err(AuthError::Internal("admin API key is not configured".to_string()));
        }
        let matches: bool = self
            .admin_api_key
            .as_bytes()
            .ct_eq(provided.as_bytes())
            .into();
        if matches {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }
}

pub fn extract_admin_key(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("X-Admin-Api-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(key: &str) -> AdminAuth {
        AdminAuth::new(&AuthConfig {
            admin_api_key: key.to_string(),
            ..AuthConfig::default()
        })
    }

    #[test]
    fn matching_key_verifies() {
        assert!(auth("secret").verify(Some("secret")).is_ok());
    }

    #[test]
    fn mismatched_key_is_invalid() {
        assert!(matches!(auth("secret").verify(Some("wrong")), Err(AuthError::Invalid)));
    }

    #[test]
    fn missing_key_is_missing() {
        assert!(matches!(auth("secret").verify(None), Err(AuthError::Missing)));
    }
}
