//! Bring-up retry policy

use std::time::Duration;

/// How bring-up reacts to failed sends
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive failures before the node degrades; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Wait after the first failure
    pub initial_backoff: Duration,
    /// Upper bound for the wait
    pub max_backoff: Duration,
    /// Growth factor applied after every failure
    pub multiplier: u32,
    /// Wait between uplink probes while degraded
    pub degraded_probe_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: Some(8),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
            multiplier: 2,
            degraded_probe_interval: Duration::from_secs(900),
        }
    }
}

impl RetryPolicy {
    /// Retry on the very next step, forever
    pub fn immediate() -> Self {
        RetryPolicy {
            max_attempts: None,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1,
            degraded_probe_interval: Duration::ZERO,
        }
    }

    /// Give up quickly, for nodes that must not burn battery on a dead link
    pub fn battery_saver() -> Self {
        RetryPolicy {
            max_attempts: Some(3),
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
            multiplier: 3,
            degraded_probe_interval: Duration::from_secs(3600),
        }
    }

    /// Wait after `failures` consecutive failures (1-based)
    pub fn backoff(&self, failures: u32) -> Duration {
        if failures == 0 || self.initial_backoff.is_zero() {
            return Duration::ZERO;
        }

        let mut wait = self.initial_backoff;
        for _ in 1..failures {
            wait = wait.saturating_mul(self.multiplier.max(1));
            if wait >= self.max_backoff {
                return self.max_backoff;
            }
        }
        wait.min(self.max_backoff)
    }

    /// True once `failures` reaches the attempt limit
    #[inline]
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_attempts.is_some_and(|max| failures >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::ZERO);
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
        assert_eq!(policy.backoff(20), Duration::from_secs(300));
    }

    #[test]
    fn test_immediate_never_waits_or_degrades() {
        let policy = RetryPolicy::immediate();
        for failures in [1, 10, 1000, u32::MAX] {
            assert_eq!(policy.backoff(failures), Duration::ZERO);
            assert!(!policy.exhausted(failures));
        }
    }

    #[test]
    fn test_exhausted() {
        let policy = RetryPolicy::battery_saver();
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
    }

    proptest! {
        #[test]
        fn prop_backoff_monotonic_and_bounded(failures in 1u32..64) {
            let policy = RetryPolicy::default();
            let a = policy.backoff(failures);
            let b = policy.backoff(failures + 1);
            prop_assert!(a <= b);
            prop_assert!(b <= policy.max_backoff);
        }
    }
}
