//! `POST /admin/anchors/snapshot`.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use consent_core::anchor::{anchor_commit_line, build_anchor_snapshot};
use consent_core::export::{build_lineage_export, StoredLineageEvent};
use consent_types::DataEnvelope;

use crate::dto::admin::AnchorSnapshotRequest;
use crate::dto::anchor::SnapshotResponse;
use crate::error::ApiResult;
use crate::extractors::{RequireAdmin, StrictJson};
use crate::state::AppState;

/// Rebuilds every per-consent tenant anchor from its stored lineage
/// chain, then snapshots the sorted, deduplicated set (spec.md 6: the
/// external anchor file is append-only and never references tenant or
/// consent identifiers, only anchors).
pub async fn create_snapshot(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    StrictJson(request): StrictJson<AnchorSnapshotRequest>,
) -> ApiResult<Json<DataEnvelope<SnapshotResponse>>> {
    let pairs = state.db.lineage_repo().distinct_consents().await?;

    let mut anchors = Vec::with_capacity(pairs.len());
    for (tenant_id, consent_id) in pairs {
        let rows = state.db.lineage_repo().list_by_consent(tenant_id, consent_id).await?;
        let stored: Vec<StoredLineageEvent> = rows
            .into_iter()
            .map(|row| StoredLineageEvent {
                id: row.id,
                action: row.action,
                event_hash: row.event_hash,
                prev_event_hash: row.prev_event_hash,
                created_at: row.created_at,
            })
            .collect();
        let export = build_lineage_export(&tenant_id.to_string(), &consent_id.to_string(), &stored, None)?;
        if let Some(anchor) = export.get("tenant_anchor").and_then(Value::as_str) {
            anchors.push(anchor.to_string());
        }
    }

    let snapshot = build_anchor_snapshot(anchors, Utc::now());

    if request.write_to_file {
        if let Some(path) = &state.anchor_file_path {
            let line = anchor_commit_line(&snapshot);
            match tokio::fs::OpenOptions::new().create(true).append(true).open(path.as_path()).await {
                Ok(mut file) => {
                    if let Err(err) = file.write_all(line.as_bytes()).await {
                        warn!(event = "anchor_snapshot.file_write_failed", error = %err);
                    }
                }
                Err(err) => warn!(event = "anchor_snapshot.file_open_failed", error = %err),
            }
        }
    }

    Ok(Json(DataEnvelope::new(SnapshotResponse::from(snapshot))))
}
