//! Retry budget for profile reconciliation

use std::time::Duration;

use rentkenya_common::BackoffStrategy;
use rentkenya_domain::ReconcileConfig;

/// Retry budget and delays for resolving a profile.
///
/// A missing row is retried after a fixed delay; a failed read backs off
/// exponentially from the same base.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePolicy {
    max_attempts: u32,
    not_found: BackoffStrategy,
    on_error: BackoffStrategy,
}

impl ReconcilePolicy {
    /// Longest delay any retry may wait.
    const MAX_DELAY: Duration = Duration::from_secs(60);

    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            not_found: BackoffStrategy::Fixed(base_delay),
            on_error: BackoffStrategy::doubling(base_delay, Self::MAX_DELAY),
        }
    }

    /// Maximum number of reads per identity
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another read may be issued after `attempts` reads.
    #[must_use]
    pub fn can_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Delay before re-reading a row that is not visible yet.
    #[must_use]
    pub fn not_found_delay(&self) -> Duration {
        self.not_found.calculate_delay(0)
    }

    /// Delay before re-reading after the `attempts`-th read failed.
    ///
    /// `attempts` counts reads already issued, so the first failure waits
    /// the base delay and each further failure doubles it.
    #[must_use]
    pub fn error_delay(&self, attempts: u32) -> Duration {
        self.on_error.calculate_delay(attempts.saturating_sub(1))
    }
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self::from(&ReconcileConfig::default())
    }
}

impl From<&ReconcileConfig> for ReconcilePolicy {
    fn from(config: &ReconcileConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.base_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_three_reads_one_second_apart() {
        let policy = ReconcilePolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.not_found_delay(), Duration::from_secs(1));
        assert!(policy.can_retry(2));
        assert!(!policy.can_retry(3));
    }

    #[test]
    fn error_delay_doubles_per_failed_read() {
        let policy = ReconcilePolicy::default();
        assert_eq!(policy.error_delay(1), Duration::from_secs(1));
        assert_eq!(policy.error_delay(2), Duration::from_secs(2));
        assert_eq!(policy.error_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn zero_budget_still_allows_one_read() {
        let policy = ReconcilePolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.can_retry(1));
    }
}
