//! Security and runtime counters, grounded on `core/observability.py`.
//!
//! Production emission goes through the `metrics` crate (registered by
//! the server binary's Prometheus exporter); this module also keeps an
//! in-process registry so domain-logic tests can assert "a counter was
//! incremented" without standing up a metrics sink.

use std::collections::HashMap;
use std::sync::Mutex;

pub const METRIC_SIGNATURE_VERIFICATION_FAILED: &str = "security.signature_verification_failed";
pub const METRIC_DELEGATION_VERIFICATION_FAILED: &str = "security.delegation_verification_failed";
pub const METRIC_TENANT_WRITE_DENIED: &str = "security.tenant_write_denied";
pub const METRIC_RATE_LIMIT_ENFORCED: &str = "security.rate_limit_enforced";
pub const METRIC_APPEND_ONLY_VIOLATION_ATTEMPT: &str = "security.append_only_violation_attempt";
pub const METRIC_UNEXPECTED_EXCEPTION: &str = "runtime.unexpected_exception";

struct CounterRegistry {
    counters: Mutex<HashMap<String, u64>>,
}

impl CounterRegistry {
    fn new() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
        }
    }
}

static COUNTERS: std::sync::OnceLock<CounterRegistry> = std::sync::OnceLock::new();

fn registry() -> &'static CounterRegistry {
    COUNTERS.get_or_init(CounterRegistry::new)
}

/// Increment a named counter both in the local test-visible registry
/// and via the `metrics` crate, and log the increment as a structured
/// tracing event.
pub fn increment_metric(metric: &str, reason: Option<&str>) -> u64 {
    let mut guard = registry().counters.lock().expect("counter registry poisoned");
    let entry = guard.entry(metric.to_string()).or_insert(0);
    *entry += 1;
    let value = *entry;
    drop(guard);

    metrics::counter!(metric.to_string()).increment(1);
    tracing::info!(event = "metric.increment", metric, value, reason);
    value
}

/// Read a counter's current value (test use).
pub fn counter_value(metric: &str) -> u64 {
    registry()
        .counters
        .lock()
        .expect("counter registry poisoned")
        .get(metric)
        .copied()
        .unwrap_or(0)
}

/// Reset all counters. Tests must call this between runs since the
/// registry is process-global.
pub fn reset_counters() {
    registry()
        .counters
        .lock()
        .expect("counter registry poisoned")
        .clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_and_resets() {
        reset_counters();
        increment_metric(METRIC_TENANT_WRITE_DENIED, Some("suspended"));
        increment_metric(METRIC_TENANT_WRITE_DENIED, None);
        assert_eq!(counter_value(METRIC_TENANT_WRITE_DENIED), 2);
        reset_counters();
        assert_eq!(counter_value(METRIC_TENANT_WRITE_DENIED), 0);
    }
}
