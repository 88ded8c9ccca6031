use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use consent_core::system_events::SystemEventRecord;
use consent_db::DbSystemEvent;

#[derive(Debug, Serialize)]
pub struct SystemEventResponse {
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

impl From<DbSystemEvent> for SystemEventResponse {
    fn from(row: DbSystemEvent) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            event_type: row.event_type,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            payload_hash: row.payload_hash,
            prev_event_hash: row.prev_event_hash,
            event_hash: row.event_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SystemEventListResponse {
    pub events: Vec<SystemEventResponse>,
}

/// Wire shape for `POST /system/verify`: `SystemEventRecord` carries no
/// serde impl of its own since the only place it's built from JSON is
/// this one public, unauthenticated endpoint.
#[derive(Debug, Deserialize)]
pub struct SystemEventWire {
    pub event_type: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    pub payload_hash: String,
    #[serde(default)]
    pub prev_event_hash: Option<String>,
    pub event_hash: String,
}

impl From<SystemEventWire> for SystemEventRecord {
    fn from(wire: SystemEventWire) -> Self {
        Self {
            event_type: wire.event_type,
            tenant_id: wire.tenant_id,
            resource_type: wire.resource_type,
            resource_id: wire.resource_id,
            payload_hash: wire.payload_hash,
            prev_event_hash: wire.prev_event_hash,
            event_hash: wire.event_hash,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SystemChainVerifyRequest {
    pub events: Vec<SystemEventWire>,
}
