use serde::Serialize;

/// Shared response shape for the four public `POST /{lineage,proofs,
/// anchors,system}/verify` routes. Each wraps a different core
/// verification result, so only `verified`/`failure_reason` are common;
/// the rest rides along in `details`.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
    pub failure_reason: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Value,
}
