use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use consent_db::DbTenant;

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TransitionLifecycleRequest {
    pub lifecycle_state: String,
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub id: Uuid,
    pub name: String,
    pub lifecycle_state: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DbTenant> for TenantResponse {
    fn from(row: DbTenant) -> Self {
        Self {
            id: row.id,
            name: row.name,
            lifecycle_state: row.lifecycle_state,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub label: String,
}

/// The raw key is surfaced exactly once, at creation, and never stored
/// or retrievable again — only its hash lives in `DbApiKey`.
#[derive(Debug, Serialize)]
pub struct CreateApiKeyResponse {
    pub id: Uuid,
    pub raw_key: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<consent_db::DbApiKey> for ApiKeyResponse {
    fn from(row: consent_db::DbApiKey) -> Self {
        Self {
            id: row.id,
            label: row.label,
            created_at: row.created_at,
            revoked_at: row.revoked_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnchorSnapshotRequest {
    #[serde(default)]
    pub write_to_file: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateWebhookEndpointRequest {
    pub url: String,
    pub signing_secret: String,
}

/// `signing_secret` is accepted once on creation but never echoed back
/// — the same stance `CreateApiKeyResponse` takes on its raw key.
#[derive(Debug, Serialize)]
pub struct WebhookEndpointResponse {
    pub id: Uuid,
    pub url: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<consent_db::DbWebhookEndpoint> for WebhookEndpointResponse {
    fn from(row: consent_db::DbWebhookEndpoint) -> Self {
        Self {
            id: row.id,
            url: row.url,
            enabled: row.enabled,
            created_at: row.created_at,
        }
    }
}
