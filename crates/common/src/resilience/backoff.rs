//! Backoff strategies for retry delays

use std::time::Duration;

/// Backoff strategy for retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: initial_delay * base^exponent, capped at max_delay
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Doubling backoff starting at `initial_delay`.
    #[must_use]
    pub fn doubling(initial_delay: Duration, max_delay: Duration) -> Self {
        Self::Exponential { initial_delay, base: 2.0, max_delay }
    }

    /// Calculate the delay for the given zero-based exponent.
    ///
    /// `Fixed` ignores the exponent. `Exponential` returns
    /// `initial_delay * base^exponent`, never more than `max_delay`.
    #[must_use]
    pub fn calculate_delay(&self, exponent: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(exponent).unwrap_or(i32::MAX);
                let delay_ms = initial_delay.as_millis() as f64 * base.powi(exponent);
                let capped = delay_ms.min(max_delay.as_millis() as f64);
                if capped.is_finite() && capped > 0.0 {
                    Duration::from_millis(capped as u64)
                } else {
                    Duration::ZERO
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_ignores_exponent() {
        let strategy = BackoffStrategy::Fixed(Duration::from_secs(1));
        assert_eq!(strategy.calculate_delay(0), Duration::from_secs(1));
        assert_eq!(strategy.calculate_delay(7), Duration::from_secs(1));
    }

    #[test]
    fn doubling_grows_then_caps() {
        let strategy =
            BackoffStrategy::doubling(Duration::from_millis(1000), Duration::from_secs(5));

        assert_eq!(strategy.calculate_delay(0), Duration::from_millis(1000));
        assert_eq!(strategy.calculate_delay(1), Duration::from_millis(2000));
        assert_eq!(strategy.calculate_delay(2), Duration::from_millis(4000));
        assert_eq!(strategy.calculate_delay(3), Duration::from_secs(5));
        assert_eq!(strategy.calculate_delay(u32::MAX), Duration::from_secs(5));
    }
}
