//! # Backoff Calculator
//!
//! Exponential delay between retry attempts of the same step:
//! `min(base * multiplier^(attempt - 1), max)`. A zero base retries on the next
//! scheduling pass.

use crate::config::BackoffConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BackoffCalculator {
    config: BackoffConfig,
}

impl BackoffCalculator {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Delay before the retry that follows failed attempt number `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.config.base_delay_ms == 0 {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_ms = self.config.base_delay_ms as f64 * self.config.multiplier.powi(exponent);
        let capped = delay_ms.min(self.config.max_delay_ms as f64);

        Duration::from_millis(capped as u64)
    }
}

impl Default for BackoffCalculator {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_immediate() {
        let calc = BackoffCalculator::default();
        assert_eq!(calc.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(calc.delay_for_attempt(10), Duration::ZERO);
    }

    #[test]
    fn test_exponential_growth_is_capped() {
        let calc = BackoffCalculator::new(BackoffConfig::new(
            Duration::from_millis(100),
            Duration::from_millis(1_000),
            2.0,
        ));
        assert_eq!(calc.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(calc.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(calc.delay_for_attempt(4), Duration::from_millis(800));
        assert_eq!(calc.delay_for_attempt(5), Duration::from_millis(1_000));
        assert_eq!(calc.delay_for_attempt(u32::MAX), Duration::from_millis(1_000));
    }
}
