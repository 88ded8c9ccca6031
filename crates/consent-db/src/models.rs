//! Row types for every entity in the data model (spec section 3).
//!
//! Grounded on `openibank-db::models`'s `#[derive(FromRow)]` pattern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbTenant {
    pub id: Uuid,
    pub name: String,
    pub lifecycle_state: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbApiKey {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub key_hash: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbConsent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub subject_id: String,
    pub purpose: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbAuditEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub consent_id: Uuid,
    pub action: String,
    pub actor: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbLineageEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub consent_id: Uuid,
    pub action: String,
    pub event_hash: String,
    pub prev_event_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbIdentityKey {
    pub id: Uuid,
    pub scope: String,
    pub owner_id: Option<String>,
    pub public_key: String,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbIdentityDelegation {
    pub id: Uuid,
    pub parent_key_id: Uuid,
    pub child_key_id: Uuid,
    pub delegation_type: String,
    pub signature: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbSignedAssertion {
    pub id: Uuid,
    pub identity_key_id: Uuid,
    pub subject_type: String,
    pub subject_id: Option<String>,
    pub assertion_type: String,
    pub payload: serde_json::Value,
    pub signature: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbSystemEvent {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub event_type: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub payload_hash: String,
    pub prev_event_hash: Option<String>,
    pub event_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbIdempotencyKey {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub key: String,
    pub request_hash: String,
    pub response_json: serde_json::Value,
    pub status_code: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbRateCounter {
    pub identity: String,
    pub window: i64,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbWebhookEndpoint {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub url: String,
    pub signing_secret: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbWebhookDelivery {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub endpoint_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub dedupe_key: String,
    pub status: String,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
