//! Consent Ledger Authentication Layer
//!
//! - **Tenant API keys**: bearer-token auth, `Authorization: Bearer` or
//!   `X-Api-Key`, backed by an HMAC-SHA256 key hash.
//! - **Admin auth**: a distinct `X-Admin-Api-Key` namespace, not a
//!   tenant-scoped credential.
//! - **Rate limiting**: durable fixed-window limiter per identity
//!   fingerprint, fail-closed in prod/staging.

pub mod admin;
pub mod api_key;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod rate_limit;
pub mod types;

pub use admin::AdminAuth;
pub use api_key::ApiKeyService;
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use middleware::{AuthLayer, RequireAuth};
pub use rate_limit::RateLimiter;
pub use types::AuthenticatedCaller;

use std::sync::Arc;

use consent_db::Database;

/// Combines every auth component behind one construction point,
/// grounded on `openibank-auth::AuthService`.
#[derive(Clone)]
pub struct AuthService {
    pub api_key: ApiKeyService,
    pub admin: AdminAuth,
    pub rate_limiter: RateLimiter,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(db: &Database, config: AuthConfig) -> Self {
        let api_key = ApiKeyService::new(db, &config);
        let admin = AdminAuth::new(&config);
        let rate_limiter = RateLimiter::new(db, config.rate_limit.clone());

        Self {
            api_key,
            admin,
            rate_limiter,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn layer(&self) -> AuthLayer {
        AuthLayer::new(Arc::new(self.api_key.clone()), Arc::new(self.rate_limiter.clone()))
    }
}
