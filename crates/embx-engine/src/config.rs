use std::time::Duration;

use embx_core::RetryPolicy;

/// Knobs the dispatcher reads once at construction.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on concurrent remote calls across all providers.
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Applies to each remote call attempt on its own.
    pub call_timeout: Duration,
    /// Wall-clock limit for a whole batch; unresolved items become `Timeout`.
    pub batch_deadline: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(30),
            batch_deadline: None,
        }
    }
}

impl DispatcherConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let retry = RetryPolicy {
            max_attempts: u32::try_from(env_usize(&lookup, "EMBX_RETRY_ATTEMPTS", 3, 1, 10))
                .unwrap_or(3),
            base_backoff: millis(env_usize(&lookup, "EMBX_RETRY_BACKOFF_MS", 250, 0, 60_000)),
            multiplier: env_f64(&lookup, "EMBX_RETRY_MULTIPLIER", 2.0, 1.0, 10.0),
            jitter: millis(env_usize(&lookup, "EMBX_RETRY_JITTER_MS", 100, 0, 10_000)),
            max_backoff: millis(env_usize(
                &lookup,
                "EMBX_RETRY_MAX_BACKOFF_MS",
                10_000,
                0,
                300_000,
            )),
            ..d.retry
        };
        let timeout_secs = env_usize(&lookup, "EMBX_TIMEOUT_SECONDS", 30, 1, 600);
        let batch_deadline = lookup("EMBX_BATCH_DEADLINE_SECONDS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|s| *s > 0)
            .map(Duration::from_secs);

        Self {
            concurrency: env_usize(&lookup, "EMBX_CONCURRENCY", d.concurrency, 1, 64),
            retry,
            call_timeout: Duration::from_secs(timeout_secs as u64),
            batch_deadline,
        }
    }
}

fn millis(ms: usize) -> Duration {
    Duration::from_millis(ms as u64)
}

pub fn env_usize<F>(lookup: &F, name: &str, default: usize, min: usize, max: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}

pub fn env_f64<F>(lookup: &F, name: &str, default: f64, min: f64, max: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
        .clamp(min, max)
}

pub fn env_bool<F>(lookup: &F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = DispatcherConfig::from_lookup(vars(&[]));
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.call_timeout, Duration::from_secs(30));
        assert!(cfg.batch_deadline.is_none());
    }

    #[test]
    fn values_are_parsed_and_clamped() {
        let cfg = DispatcherConfig::from_lookup(vars(&[
            ("EMBX_CONCURRENCY", "500"),
            ("EMBX_RETRY_ATTEMPTS", "0"),
            ("EMBX_RETRY_BACKOFF_MS", "40"),
            ("EMBX_RETRY_MULTIPLIER", "nan"),
            ("EMBX_TIMEOUT_SECONDS", " 12 "),
            ("EMBX_BATCH_DEADLINE_SECONDS", "90"),
        ]));
        assert_eq!(cfg.concurrency, 64);
        assert_eq!(cfg.retry.max_attempts, 1);
        assert_eq!(cfg.retry.base_backoff, Duration::from_millis(40));
        assert!((cfg.retry.multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(cfg.call_timeout, Duration::from_secs(12));
        assert_eq!(cfg.batch_deadline, Some(Duration::from_secs(90)));
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        let lookup = vars(&[("A", "Yes"), ("B", "off"), ("C", "maybe")]);
        assert!(env_bool(&lookup, "A", false));
        assert!(!env_bool(&lookup, "B", true));
        assert!(env_bool(&lookup, "C", true));
        assert!(!env_bool(&lookup, "MISSING", false));
    }
}
