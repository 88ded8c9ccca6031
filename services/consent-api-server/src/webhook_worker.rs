//! Cooperative webhook delivery worker: a tokio task that polls due
//! deliveries, POSTs them, and retries on the schedule in
//! `consent_core::webhook`. Stop signaling follows the same
//! `tokio::select!` shape `main.rs`'s `shutdown_signal` uses for the
//! HTTP server's own graceful shutdown — the worker's loop just
//! selects on a `watch` channel instead of OS signals, so both can be
//! driven from the same shutdown event.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::sync::watch;

use consent_core::webhook::{is_retryable_status, max_attempts, next_backoff_secs, sign_payload};
use consent_db::Database;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const CLAIM_BATCH: i64 = 25;

/// Runs until `stop_rx` observes `true`. Each iteration claims a batch
/// of due deliveries, sends them, and reschedules or finalizes each
/// one independently — one delivery's failure never blocks another's.
pub async fn run(db: Arc<Database>, mut stop_rx: watch::Receiver<bool>) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("reqwest client builds with a static timeout");

    tracing::info!("webhook delivery worker started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                if let Err(err) = poll_once(&db, &client).await {
                    tracing::warn!(event = "webhook_worker.poll_failed", error = %err);
                }
            }
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("webhook delivery worker stopped");
}

async fn poll_once(db: &Database, client: &reqwest::Client) -> anyhow::Result<()> {
    let claimed = db.webhook_repo().claim_due(CLAIM_BATCH).await?;

    for (delivery, endpoint) in claimed {
        let body = serde_json::to_vec(&delivery.payload)?;
        let signature = sign_payload(&endpoint.signing_secret, &body).map_err(|e| anyhow::anyhow!(e.to_string()))?;

        let result = client
            .post(&endpoint.url)
            .header("Content-Type", "application/json")
            .header("X-Webhook-Signature", signature)
            .header("X-Webhook-Event-Type", &delivery.event_type)
            .body(body)
            .send()
            .await;

        let outcome = match result {
            Ok(response) if response.status().is_success() => None,
            Ok(response) => Some(response.status().as_u16()),
            Err(_) => Some(0),
        };

        match outcome {
            None => {
                db.webhook_repo().mark_delivered(delivery.id).await?;
            }
            Some(status) if delivery.attempts as u32 >= max_attempts() || !is_retryable_status(status) => {
                tracing::warn!(
                    event = "webhook_worker.delivery_failed",
                    delivery_id = %delivery.id,
                    status,
                    "giving up on webhook delivery"
                );
                db.webhook_repo().mark_retry_or_failed(delivery.id, None).await?;
            }
            Some(status) => {
                let backoff = next_backoff_secs(delivery.attempts as u32).unwrap_or(3600);
                tracing::debug!(event = "webhook_worker.retry_scheduled", delivery_id = %delivery.id, status, backoff);
                db.webhook_repo()
                    .mark_retry_or_failed(delivery.id, Some(ChronoDuration::seconds(backoff)))
                    .await?;
            }
        }
    }

    Ok(())
}
