//! Durable fixed-window rate counter. Grounded on `core/rate_limit.py`'s
//! `SQLiteRateLimiter`: delete stale windows, upsert the current
//! window's count, compare to the limit — all inside one transaction so
//! concurrent callers serialize through Postgres's own locking.

use sqlx::PgPool;

use consent_core::rate_limit::{self, RateLimitDecision};

use crate::DbResult;

pub struct RateCounterRepo {
    pool: PgPool,
}

impl RateCounterRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Evaluate one call against the per-minute limit for `identity`,
    /// atomically incrementing the current window's counter.
    pub async fn allow(&self, identity: &str, limit_per_minute: u64, now_unix: i64) -> DbResult<RateLimitDecision> {
        let window = rate_limit::current_window(now_unix);
        let stale_before = window - 2;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM rate_counters WHERE identity = $1 AND window < $2")
            .bind(identity)
            .bind(stale_before)
            .execute(&mut *tx)
            .await?;

        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO rate_counters (identity, window, count)
            VALUES ($1, $2, 1)
            ON CONFLICT (identity, window) DO UPDATE SET count = rate_counters.count + 1
            RETURNING count
            "#,
        )
        .bind(identity)
        .bind(window)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(rate_limit::decide(count as u64, limit_per_minute))
    }
}
