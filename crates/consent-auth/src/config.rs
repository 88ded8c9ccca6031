//! Authentication configuration, grounded on `openibank-auth::config`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Server secret the API-key HMAC is keyed with (spec.md 6's
    /// "API-key hash secret", required in prod).
    pub api_key_hash_secret: String,
    /// Separate namespace admin credential (`X-Admin-Api-Key`).
    pub admin_api_key: String,
    pub rate_limit: RateLimitConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key_hash_secret: String::new(),
            admin_api_key: String::new(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests allowed per identity fingerprint per 60-second window.
    pub requests_per_minute: u64,
    pub environment: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 120,
            environment: "dev".to_string(),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            api_key_hash_secret: std::env::var("API_KEY_HASH_SECRET").unwrap_or_default(),
            admin_api_key: std::env::var("ADMIN_API_KEY").unwrap_or_default(),
            rate_limit: RateLimitConfig {
                enabled: std::env::var("RATE_LIMIT_ENABLED")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
                requests_per_minute: std::env::var("RATE_LIMIT_PER_MINUTE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
                environment: std::env::var("ENV").unwrap_or_else(|_| "dev".to_string()),
            },
        }
    }
}
