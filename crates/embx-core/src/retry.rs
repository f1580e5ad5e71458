use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::ErrorKind;

/// Retry budget and backoff curve for remote calls.
///
/// `max_attempts` counts every invocation, the first one included.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub multiplier: f64,
    pub jitter: Duration,
    pub max_backoff: Duration,
    pub retryable: BTreeSet<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(250),
            multiplier: 2.0,
            jitter: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            retryable: ErrorKind::ALL
                .into_iter()
                .filter(|k| k.is_transient())
                .collect(),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        self.retryable.contains(&kind)
    }

    /// Whether another attempt may follow `attempt` (1-based) failing with `kind`.
    pub fn should_retry(&self, attempt: u32, kind: ErrorKind) -> bool {
        attempt < self.max_attempts.max(1) && self.is_retryable(kind)
    }

    /// Deterministic part of the wait before retry number `retry` (1-based):
    /// `base * multiplier^(retry - 1)`, capped at `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exp);
        let secs = self.base_backoff.as_secs_f64() * factor;
        let cap = self.max_backoff.as_secs_f64();
        if !secs.is_finite() || secs >= cap {
            return self.max_backoff;
        }
        Duration::from_secs_f64(secs)
    }

    /// Full wait including jitter; `unit` is a uniform sample in `[0, 1)`.
    pub fn backoff_with_jitter(&self, retry: u32, unit: f64) -> Duration {
        let jitter = self.jitter.mul_f64(unit.clamp(0.0, 1.0));
        self.backoff(retry) + jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            base_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: Duration::from_millis(50),
            max_backoff: Duration::from_millis(350),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let p = policy();
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(350));
        assert_eq!(p.backoff(40), Duration::from_millis(350));
    }

    #[test]
    fn jitter_is_bounded() {
        let p = policy();
        assert_eq!(p.backoff_with_jitter(1, 0.0), Duration::from_millis(100));
        assert_eq!(p.backoff_with_jitter(1, 1.0), Duration::from_millis(150));
        assert_eq!(p.backoff_with_jitter(1, 7.0), Duration::from_millis(150));
    }

    #[test]
    fn attempts_stop_at_budget() {
        let p = policy();
        assert!(p.should_retry(1, ErrorKind::RateLimited));
        assert!(p.should_retry(3, ErrorKind::Timeout));
        assert!(!p.should_retry(4, ErrorKind::RateLimited));
    }

    #[test]
    fn non_retryable_kinds_fail_immediately() {
        let p = policy();
        assert!(!p.should_retry(1, ErrorKind::AuthError));
        assert!(!p.should_retry(1, ErrorKind::InvalidModel));
        assert!(!p.should_retry(1, ErrorKind::MalformedResponse));
        assert!(!p.should_retry(1, ErrorKind::ProviderError));
    }

    #[test]
    fn no_retry_allows_single_attempt() {
        assert!(!RetryPolicy::no_retry().should_retry(1, ErrorKind::NetworkError));
    }
}
