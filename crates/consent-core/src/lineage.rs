//! Append-only per-consent lineage chain.
//!
//! Grounded on `core/lineage.py`. The append side (tip lookup,
//! monotonic-microsecond bump) is orchestration over a store and lives
//! in `consent-db`; this module holds the pure hash/verify math so it
//! can be exercised without a database (spec.md section 5: hash/verify
//! are pure CPU, suspension points are I/O only).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineageAction {
    Created,
    Updated,
    Revoked,
    Noop,
}

impl LineageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineageAction::Created => "created",
            LineageAction::Updated => "updated",
            LineageAction::Revoked => "revoked",
            LineageAction::Noop => "noop",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "revoked" => Some(Self::Revoked),
            "noop" => Some(Self::Noop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsentStatus {
    Active,
    Revoked,
}

impl ConsentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentStatus::Active => "ACTIVE",
            ConsentStatus::Revoked => "REVOKED",
        }
    }
}

/// Fields that go into the lineage event-hash body, minus `tenant_id`,
/// `consent_id`, `action`, `prev_hash` (those are in the outer material).
#[derive(Debug, Clone)]
pub struct LineagePayload {
    pub subject_id: String,
    pub purpose: String,
    pub status: String,
}

impl LineagePayload {
    fn to_value(&self) -> serde_json::Value {
        json!({
            "subject_id": self.subject_id,
            "purpose": self.purpose,
            "status": self.status,
        })
    }
}

/// A lineage event as read back from storage, for verification.
#[derive(Debug, Clone)]
pub struct LineageEventRecord {
    pub action: LineageAction,
    pub event_hash: String,
    pub prev_event_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Compute the event hash for a lineage append, given the already
/// resolved `prev_hash` and the full hash-body payload.
pub fn compute_lineage_event_hash(
    tenant_id: &str,
    consent_id: &str,
    action: LineageAction,
    payload: &LineagePayload,
    prev_hash: Option<&str>,
) -> CoreResult<String> {
    Ok(consent_crypto::compute_event_hash(
        tenant_id,
        consent_id,
        action.as_str(),
        &payload.to_value(),
        prev_hash,
    )?)
}

/// The microsecond-monotonic `created_at` rule: if the wall clock has
/// not advanced past the tip, bump by 1µs beyond it.
pub fn next_created_at(now: DateTime<Utc>, tip_created_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match tip_created_at {
        Some(tip) if now <= tip => tip + chrono::Duration::microseconds(1),
        _ => now,
    }
}

/// Derive the status at each event index by replaying backward from
/// the known current status, inverting each action's effect.
/// Returns `None` if an unrecognized action is encountered.
fn derive_event_statuses(
    events: &[LineageEventRecord],
    current_status: ConsentStatus,
) -> Option<Vec<ConsentStatus>> {
    if events.is_empty() {
        return Some(Vec::new());
    }
    let mut statuses = vec![current_status; events.len()];
    let mut status_at_event = current_status;
    for idx in (0..events.len()).rev() {
        statuses[idx] = status_at_event;
        if idx == 0 {
            break;
        }
        status_at_event = match events[idx].action {
            LineageAction::Updated => match status_at_event {
                ConsentStatus::Active => ConsentStatus::Revoked,
                ConsentStatus::Revoked => ConsentStatus::Active,
            },
            LineageAction::Revoked => ConsentStatus::Active,
            LineageAction::Noop | LineageAction::Created => status_at_event,
        };
    }
    Some(statuses)
}

/// Replay the chain against the *current* consent state, recomputing
/// each event's hash and checking `prev_event_hash` continuity.
pub fn verify_lineage_chain(
    events: &[LineageEventRecord],
    tenant_id: &str,
    consent_id: &str,
    subject_id: &str,
    purpose: &str,
    current_status: ConsentStatus,
) -> CoreResult<bool> {
    let Some(statuses) = derive_event_statuses(events, current_status) else {
        return Ok(false);
    };

    let mut prev_hash: Option<String> = None;
    for (idx, event) in events.iter().enumerate() {
        let payload = LineagePayload {
            subject_id: subject_id.to_string(),
            purpose: purpose.to_string(),
            status: statuses[idx].as_str().to_string(),
        };
        let expected = compute_lineage_event_hash(
            tenant_id,
            consent_id,
            event.action,
            &payload,
            prev_hash.as_deref(),
        )?;
        if !consent_crypto::constant_time_hex_eq(&event.event_hash, &expected) {
            return Ok(false);
        }
        if event.prev_event_hash != prev_hash {
            return Ok(false);
        }
        prev_hash = Some(event.event_hash.clone());
    }
    Ok(true)
}

/// Parse an action string read back from storage, failing closed.
pub fn parse_action(raw: &str) -> CoreResult<LineageAction> {
    LineageAction::from_str(raw).ok_or_else(|| CoreError::Validation(format!("unknown lineage action: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ev(action: LineageAction, event_hash: &str, prev: Option<&str>, at: i64) -> LineageEventRecord {
        LineageEventRecord {
            action,
            event_hash: event_hash.to_string(),
            prev_event_hash: prev.map(|s| s.to_string()),
            created_at: Utc.timestamp_opt(at, 0).unwrap(),
        }
    }

    fn chain_for(
        tenant_id: &str,
        consent_id: &str,
        subject_id: &str,
        purpose: &str,
        actions_and_statuses: &[(LineageAction, ConsentStatus)],
    ) -> Vec<LineageEventRecord> {
        let mut prev: Option<String> = None;
        let mut out = Vec::new();
        for (i, (action, status)) in actions_and_statuses.iter().enumerate() {
            let payload = LineagePayload {
                subject_id: subject_id.to_string(),
                purpose: purpose.to_string(),
                status: status.as_str().to_string(),
            };
            let hash =
                compute_lineage_event_hash(tenant_id, consent_id, *action, &payload, prev.as_deref())
                    .unwrap();
            out.push(ev(*action, &hash, prev.as_deref(), 1_700_000_000 + i as i64));
            prev = Some(hash);
        }
        out
    }

    #[test]
    fn s1_single_created_event_verifies() {
        let events = chain_for(
            "t",
            "c",
            "u",
            "p",
            &[(LineageAction::Created, ConsentStatus::Active)],
        );
        assert!(verify_lineage_chain(&events, "t", "c", "u", "p", ConsentStatus::Active).unwrap());
    }

    #[test]
    fn s2_toggle_sequence_verifies() {
        let events = chain_for(
            "t",
            "c",
            "u",
            "p",
            &[
                (LineageAction::Created, ConsentStatus::Active),
                (LineageAction::Revoked, ConsentStatus::Revoked),
                (LineageAction::Updated, ConsentStatus::Active),
            ],
        );
        assert!(verify_lineage_chain(&events, "t", "c", "u", "p", ConsentStatus::Active).unwrap());
    }

    #[test]
    fn tamper_detection_flips_one_hex_char() {
        let mut events = chain_for(
            "t",
            "c",
            "u",
            "p",
            &[(LineageAction::Created, ConsentStatus::Active)],
        );
        let mut chars: Vec<char> = events[0].event_hash.chars().collect();
        chars[0] = if chars[0] == 'a' { 'b' } else { 'a' };
        events[0].event_hash = chars.into_iter().collect();
        assert!(!verify_lineage_chain(&events, "t", "c", "u", "p", ConsentStatus::Active).unwrap());
    }

    #[test]
    fn cross_tenant_graft_fails() {
        let events_a = chain_for(
            "tenant-a",
            "c",
            "u",
            "p",
            &[(LineageAction::Created, ConsentStatus::Active)],
        );
        // Verifying tenant-a's events under tenant-b's id must fail: the
        // material includes tenant_id, so the recomputed hash differs.
        assert!(!verify_lineage_chain(&events_a, "tenant-b", "c", "u", "p", ConsentStatus::Active).unwrap());
    }

    #[test]
    fn monotonic_bump_when_clock_does_not_advance() {
        let tip = Utc.timestamp_opt(1_700_000_000, 500_000).unwrap();
        let next = next_created_at(tip, Some(tip));
        assert!(next > tip);
        assert_eq!((next - tip).num_microseconds(), Some(1));
    }
}
