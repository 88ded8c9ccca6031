//! Webhook delivery decision logic: signing, retry backoff, and the
//! dedupe key a delivery is enqueued under.
//!
//! Grounded on `core/webhooks.py`'s signing scheme and
//! `core/webhook_worker.py`'s backoff schedule; pure and
//! storage-agnostic like the rest of `consent-core`, with
//! `consent-db::repos::webhook` doing the actual enqueue/claim/mark
//! against Postgres.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{CoreError, CoreResult};

type HmacSha256 = Hmac<Sha256>;

/// Fixed backoff schedule in seconds, indexed by attempt count so far
/// (0 = first retry). Delivery gives up after the schedule is
/// exhausted; the caller marks the row `failed` rather than rescheduling.
pub const RETRY_BACKOFF_SECS: &[i64] = &[5, 30, 120, 600, 3600];

pub fn max_attempts() -> u32 {
    RETRY_BACKOFF_SECS.len() as u32
}

/// Seconds until the next attempt, or `None` once the schedule is exhausted.
pub fn next_backoff_secs(attempts_so_far: u32) -> Option<i64> {
    RETRY_BACKOFF_SECS.get(attempts_so_far as usize).copied()
}

/// `X-Webhook-Signature: sha256=<hex hmac>` over the exact body bytes
/// that get sent, so a receiver can verify without re-deriving JSON
/// formatting.
pub fn sign_payload(secret: &str, body: &[u8]) -> CoreResult<String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| CoreError::Validation(e.to_string()))?;
    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Deterministic dedupe key for a delivery derived from the event it
/// carries, so re-enqueuing the same lineage/system event against the
/// same endpoint is a no-op under the `(endpoint_id, dedupe_key)`
/// unique index rather than a duplicate send.
pub fn dedupe_key(event_type: &str, event_hash: &str) -> String {
    format!("{event_type}:{event_hash}")
}

/// Whether an HTTP response status should be retried. 2xx is success
/// (not retried, never reaches here); 4xx other than 429 is a
/// permanent rejection; everything else (5xx, 429, no response) is
/// retried until the schedule is exhausted.
pub fn is_retryable_status(status: u16) -> bool {
    !(400..500).contains(&status) || status == 429
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic() {
        let a = sign_payload("secret", b"body").unwrap();
        let b = sign_payload("secret", b"body").unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("sha256="));
    }

    #[test]
    fn different_secrets_produce_different_signatures() {
        let a = sign_payload("secret-a", b"body").unwrap();
        let b = sign_payload("secret-b", b"body").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn backoff_schedule_is_exhaustible() {
        assert_eq!(next_backoff_secs(0), Some(5));
        assert_eq!(next_backoff_secs(4), Some(3600));
        assert_eq!(next_backoff_secs(5), None);
    }

    #[test]
    fn client_errors_are_permanent_except_429() {
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
    }

    #[test]
    fn dedupe_key_is_stable_for_same_inputs() {
        assert_eq!(dedupe_key("lineage.created", "abc"), dedupe_key("lineage.created", "abc"));
        assert_ne!(dedupe_key("lineage.created", "abc"), dedupe_key("lineage.revoked", "abc"));
    }
}
