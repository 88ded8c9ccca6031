//! Durable fixed-window rate limiter, grounded on `openibank-auth::rate_limit`'s
//! shape but wrapping `consent-db`'s Postgres-backed counter and
//! `consent-core::rate_limit`'s pure window arithmetic. Fails closed in
//! prod/staging, fails open in dev/test (spec.md 4.I).

use std::sync::Arc;

use consent_core::rate_limit::{fails_closed, RateLimitDecision};
use consent_db::{repos::RateCounterRepo, Database};

use crate::config::RateLimitConfig;
use crate::error::AuthError;

#[derive(Clone)]
pub struct RateLimiter {
    repo: Arc<RateCounterRepo>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(db: &Database, config: RateLimitConfig) -> Self {
        Self {
            repo: Arc::new(db.rate_counter_repo()),
            config,
        }
    }

    /// Evaluate one call against `identity`'s per-minute budget.
    pub async fn check(&self, identity: &str) -> Result<(), AuthError> {
        if !self.config.enabled {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp();
        match self.repo.allow(identity, self.config.requests_per_minute, now).await {
            Ok(RateLimitDecision::Allow) => Ok(()),
            Ok(RateLimitDecision::Deny) => Err(AuthError::RateLimitExceeded { retry_after_secs: 60 }),
            Err(err) => {
                if fails_closed(&self.config.environment) {
                    Err(AuthError::Internal(err.to_string()))
                } else {
                    tracing::warn!(event = "rate_limit.store_unavailable_fail_open", error = %err);
                    Ok(())
                }
            }
        }
    }
}
