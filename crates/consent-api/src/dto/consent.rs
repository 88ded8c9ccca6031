use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use consent_db::DbConsent;

#[derive(Debug, Deserialize)]
pub struct CreateConsentRequest {
    pub subject_id: String,
    pub purpose: String,
}

/// `PUT /consents`: toggle an existing consent's status. `noop` is
/// chosen automatically when `status` already matches the current row
/// (spec 4.D: a no-op mutation records no state change but still
/// extends the chain).
#[derive(Debug, Deserialize)]
pub struct UpdateConsentRequest {
    pub consent_id: Uuid,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RevokeConsentRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsentResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub subject_id: String,
    pub purpose: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<DbConsent> for ConsentResponse {
    fn from(row: DbConsent) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            subject_id: row.subject_id,
            purpose: row.purpose,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            revoked_at: row.revoked_at,
        }
    }
}
