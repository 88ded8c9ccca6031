use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use consent_db::DbLineageEvent;

#[derive(Debug, Serialize)]
pub struct LineageEventResponse {
    pub id: Uuid,
    pub consent_id: Uuid,
    pub action: String,
    pub event_hash: String,
    pub prev_event_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbLineageEvent> for LineageEventResponse {
    fn from(row: DbLineageEvent) -> Self {
        Self {
            id: row.id,
            consent_id: row.consent_id,
            action: row.action,
            event_hash: row.event_hash,
            prev_event_hash: row.prev_event_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LineageResponse {
    pub events: Vec<LineageEventResponse>,
}
