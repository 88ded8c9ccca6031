//! Fixed 60-second window rate-limit arithmetic.
//!
//! Grounded on `core/rate_limit.py`'s `SQLiteRateLimiter`: `window =
//! now // 60`, a durable per-`(identity, window)` counter, delete of
//! stale windows, and a fail-closed/fail-open split by environment.
//! Persistence (the actual counter row) lives in `consent-db`; this
//! module is the pure window-arithmetic and allow/deny decision.

/// `window_seconds = 60`, per spec.md 4.I.
pub const WINDOW_SECONDS: i64 = 60;

/// `now // 60`, the current window index.
pub fn current_window(unix_seconds: i64) -> i64 {
    unix_seconds.div_euclid(WINDOW_SECONDS)
}

/// Windows strictly older than this are stale and may be deleted.
pub fn is_stale_window(window: i64, current: i64) -> bool {
    window < current - 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allow,
    Deny,
}

/// Given the counter value already incremented for this window, decide
/// allow/deny against the per-minute limit.
pub fn decide(count_after_increment: u64, limit_per_minute: u64) -> RateLimitDecision {
    if count_after_increment <= limit_per_minute {
        RateLimitDecision::Allow
    } else {
        RateLimitDecision::Deny
    }
}

/// Whether a rate-limiter storage failure should fail closed (deny,
/// production) or fail open (allow, dev/test) per spec.md 4.I.
pub fn fails_closed(environment: &str) -> bool {
    matches!(environment, "prod" | "production" | "staging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_buckets_by_sixty_seconds() {
        assert_eq!(current_window(0), 0);
        assert_eq!(current_window(59), 0);
        assert_eq!(current_window(60), 1);
        assert_eq!(current_window(121), 2);
    }

    #[test]
    fn stale_window_detection() {
        assert!(is_stale_window(0, 3));
        assert!(!is_stale_window(1, 3));
        assert!(!is_stale_window(2, 3));
    }

    #[test]
    fn decision_at_exact_limit_allows() {
        assert_eq!(decide(5, 5), RateLimitDecision::Allow);
        assert_eq!(decide(6, 5), RateLimitDecision::Deny);
    }

    #[test]
    fn environment_fail_policy() {
        assert!(fails_closed("prod"));
        assert!(fails_closed("staging"));
        assert!(!fails_closed("dev"));
        assert!(!fails_closed("test"));
    }
}
