use serde::Serialize;

use consent_core::anchor::AnchorSnapshot;

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    #[serde(flatten)]
    pub snapshot: AnchorSnapshot,
}

impl From<AnchorSnapshot> for SnapshotResponse {
    fn from(snapshot: AnchorSnapshot) -> Self {
        Self { snapshot }
    }
}
