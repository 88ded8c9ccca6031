//! Shared write-path plumbing: idempotency-key replay/conflict handling,
//! grounded on `core/idempotency.py` via `consent_core::idempotency` and
//! the repo's thin Postgres wrapper in `consent_db::repos::IdempotencyRepo`.

use serde_json::Value;
use uuid::Uuid;

use consent_core::idempotency::{compute_request_hash, decide, IdempotencyDecision, StoredIdempotencyRow};
use consent_db::Database;

use crate::error::{ApiError, ApiResult};

pub enum WriteOutcome {
    /// The operation executed and produced a fresh response.
    Executed { status: u16, body: Value },
    /// A prior call under the same idempotency key already produced
    /// this response; it is replayed verbatim without re-executing.
    Replayed { status: u16, body: Value },
}

impl WriteOutcome {
    pub fn into_parts(self) -> (u16, Value) {
        match self {
            WriteOutcome::Executed { status, body } | WriteOutcome::Replayed { status, body } => (status, body),
        }
    }
}

/// Run `op` under idempotency-key protection. Without a key, always
/// executes. With a key: replays a matching prior response, rejects a
/// conflicting one (409 `IDEMPOTENCY_CONFLICT`), or executes and stores
/// the result for the next call under the same key.
pub async fn run_idempotent<F, Fut>(
    db: &Database,
    tenant_id: Uuid,
    method: &str,
    path: &str,
    request_body: &Value,
    idempotency_key: Option<&str>,
    op: F,
) -> ApiResult<WriteOutcome>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = ApiResult<(u16, Value)>>,
{
    let Some(key) = idempotency_key else {
        let (status, body) = op().await?;
        return Ok(WriteOutcome::Executed { status, body });
    };

    let request_hash = compute_request_hash(method, path, request_body).map_err(|e| ApiError::Validation(e.to_string()))?;
    let repo = db.idempotency_repo();
    let existing = repo
        .find(tenant_id, key)
        .await?
        .map(|row| StoredIdempotencyRow {
            request_hash: row.request_hash,
            response_body: row.response_json,
            response_status: row.status_code as u16,
        });

    match decide(existing.as_ref(), &request_hash) {
        IdempotencyDecision::Replay => {
            let row = existing.expect("Replay implies an existing row");
            Ok(WriteOutcome::Replayed {
                status: row.response_status,
                body: row.response_body,
            })
        }
        IdempotencyDecision::Conflict => Err(ApiError::IdempotencyConflict),
        IdempotencyDecision::Fresh => {
            let (status, body) = op().await?;
            repo.store(tenant_id, key, &request_hash, &body, status as i32).await?;
            Ok(WriteOutcome::Executed { status, body })
        }
    }
}
