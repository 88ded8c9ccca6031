//! Webhook endpoint and delivery repository. Delivery claims use `FOR
//! UPDATE SKIP LOCKED` so more than one worker process can poll the
//! same queue without fighting over the same row.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{DbWebhookDelivery, DbWebhookEndpoint};
use crate::DbResult;

pub struct WebhookRepo {
    pool: PgPool,
}

impl WebhookRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_endpoint(&self, tenant_id: Uuid, url: &str, signing_secret: &str) -> DbResult<DbWebhookEndpoint> {
        let row = sqlx::query_as::<_, DbWebhookEndpoint>(
            r#"
            INSERT INTO webhook_endpoints (tenant_id, url, signing_secret)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(url)
        .bind(signing_secret)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_enabled_endpoints(&self, tenant_id: Uuid) -> DbResult<Vec<DbWebhookEndpoint>> {
        let rows = sqlx::query_as::<_, DbWebhookEndpoint>(
            "SELECT * FROM webhook_endpoints WHERE tenant_id = $1 AND enabled = TRUE ORDER BY created_at ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Enqueue one delivery per enabled endpoint for `tenant_id`. A
    /// conflict on `(endpoint_id, dedupe_key)` means this event was
    /// already enqueued for that endpoint and is silently skipped.
    pub async fn enqueue_for_tenant(
        &self,
        tenant_id: Uuid,
        event_type: &str,
        payload: &Value,
        dedupe_key: &str,
    ) -> DbResult<()> {
        let endpoints = self.list_enabled_endpoints(tenant_id).await?;
        for endpoint in endpoints {
            sqlx::query(
                r#"
                INSERT INTO webhook_deliveries (tenant_id, endpoint_id, event_type, payload, dedupe_key)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (endpoint_id, dedupe_key) DO NOTHING
                "#,
            )
            .bind(tenant_id)
            .bind(endpoint.id)
            .bind(event_type)
            .bind(payload)
            .bind(dedupe_key)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Claim up to `limit` pending deliveries whose `next_attempt_at`
    /// has passed, paired with the endpoint they target.
    pub async fn claim_due(&self, limit: i64) -> DbResult<Vec<(DbWebhookDelivery, DbWebhookEndpoint)>> {
        let mut tx = self.pool.begin().await?;

        let deliveries = sqlx::query_as::<_, DbWebhookDelivery>(
            r#"
            SELECT * FROM webhook_deliveries
            WHERE status = 'pending' AND next_attempt_at <= now()
            ORDER BY next_attempt_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        let mut claimed = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            let endpoint = sqlx::query_as::<_, DbWebhookEndpoint>("SELECT * FROM webhook_endpoints WHERE id = $1")
                .bind(delivery.endpoint_id)
                .fetch_one(&mut *tx)
                .await?;
            claimed.push((delivery, endpoint));
        }

        tx.commit().await?;
        Ok(claimed)
    }

    pub async fn mark_delivered(&self, id: Uuid) -> DbResult<()> {
        sqlx::query(
            "UPDATE webhook_deliveries SET status = 'delivered', delivered_at = now(), attempts = attempts + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reschedule for `retry_in` from now, or mark permanently `failed`
    /// when `retry_in` is `None` (schedule exhausted, or a non-retryable response).
    pub async fn mark_retry_or_failed(&self, id: Uuid, retry_in: Option<Duration>) -> DbResult<()> {
        match retry_in {
            Some(delay) => {
                let next_attempt_at: DateTime<Utc> = Utc::now() + delay;
                sqlx::query(
                    "UPDATE webhook_deliveries SET attempts = attempts + 1, next_attempt_at = $2 WHERE id = $1",
                )
                .bind(id)
                .bind(next_attempt_at)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query("UPDATE webhook_deliveries SET status = 'failed', attempts = attempts + 1 WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }
}
