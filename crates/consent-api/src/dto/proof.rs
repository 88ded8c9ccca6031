use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `asserted_at` defaults to now if omitted; accepted explicitly so a
/// caller can re-assert the same proof for an earlier point in time.
#[derive(Debug, Deserialize)]
pub struct CreateProofRequest {
    #[serde(default)]
    pub asserted_at: Option<DateTime<Utc>>,
}
