//! Tenant lifecycle state machine.
//!
//! Grounded on spec.md 4.H: suspended/disabled tenants reject writes
//! but historical reads, exports, and proofs remain available.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::observability::{increment_metric, METRIC_TENANT_WRITE_DENIED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantLifecycle {
    Active,
    Suspended,
    Disabled,
}

impl TenantLifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantLifecycle::Active => "active",
            TenantLifecycle::Suspended => "suspended",
            TenantLifecycle::Disabled => "disabled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }

    pub fn can_write(&self) -> bool {
        matches!(self, TenantLifecycle::Active)
    }

    /// Historical data (lineage reads, exports, proof verification)
    /// stays reachable regardless of lifecycle state.
    pub fn can_read(&self) -> bool {
        true
    }

    /// Allowed lifecycle transitions: active <-> suspended, and either
    /// into disabled (terminal — no transition back out).
    pub fn can_transition_to(&self, next: TenantLifecycle) -> bool {
        match (self, next) {
            (TenantLifecycle::Disabled, _) => false,
            (a, b) if *a == b => false,
            _ => true,
        }
    }
}

/// Enforce write eligibility, recording the denial metric on reject.
pub fn require_writable(tenant_id: &str, state: TenantLifecycle) -> Result<(), CoreError> {
    if state.can_write() {
        Ok(())
    } else {
        increment_metric(METRIC_TENANT_WRITE_DENIED, Some(state.as_str()));
        Err(CoreError::TenantNotWritable {
            tenant_id: tenant_id.to_string(),
            lifecycle_state: state.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_can_write() {
        assert!(require_writable("t", TenantLifecycle::Active).is_ok());
    }

    #[test]
    fn suspended_rejects_write_but_allows_read() {
        assert!(require_writable("t", TenantLifecycle::Suspended).is_err());
        assert!(TenantLifecycle::Suspended.can_read());
    }

    #[test]
    fn disabled_is_terminal() {
        assert!(!TenantLifecycle::Disabled.can_transition_to(TenantLifecycle::Active));
        assert!(TenantLifecycle::Active.can_transition_to(TenantLifecycle::Disabled));
    }
}
