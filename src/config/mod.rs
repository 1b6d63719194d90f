//! # Engine Configuration
//!
//! Operational limits for the orchestration engine. Every field has a built-in
//! default, so an empty configuration is valid; [`ConfigLoader`] layers an
//! optional TOML file and `HUNT__*` environment variables on top.
//!
//! ```toml
//! max_concurrent_steps = 4
//! default_step_timeout_ms = 60000
//!
//! [backoff]
//! base_delay_ms = 250
//! ```

pub mod error;
pub mod loader;

use crate::constants;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine-wide ceiling on steps executing at once, shared by all runs
    pub max_concurrent_steps: usize,
    /// Applied when a step declares no timeout
    pub default_step_timeout_ms: u64,
    /// Declared timeouts are clamped to this
    pub max_step_timeout_ms: u64,
    pub cancellation_grace_period_ms: u64,
    pub event_channel_capacity: usize,
    pub backoff: BackoffConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_steps: constants::DEFAULT_MAX_CONCURRENT_STEPS,
            default_step_timeout_ms: constants::DEFAULT_STEP_TIMEOUT_MS,
            max_step_timeout_ms: constants::MAX_STEP_TIMEOUT_MS,
            cancellation_grace_period_ms: constants::DEFAULT_CANCELLATION_GRACE_PERIOD_MS,
            event_channel_capacity: constants::DEFAULT_EVENT_CHANNEL_CAPACITY,
            backoff: BackoffConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrent_steps == 0 {
            return Err(ConfigurationError::invalid_value(
                "max_concurrent_steps",
                self.max_concurrent_steps,
                "must be at least 1",
            ));
        }
        if self.default_step_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "default_step_timeout_ms",
                self.default_step_timeout_ms,
                "must be greater than zero",
            ));
        }
        if self.max_step_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "max_step_timeout_ms",
                self.max_step_timeout_ms,
                "must be greater than zero",
            ));
        }
        if self.default_step_timeout_ms > self.max_step_timeout_ms {
            return Err(ConfigurationError::invalid_value(
                "default_step_timeout_ms",
                self.default_step_timeout_ms,
                format!(
                    "exceeds max_step_timeout_ms ({})",
                    self.max_step_timeout_ms
                ),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "event_channel_capacity",
                self.event_channel_capacity,
                "must be at least 1",
            ));
        }
        self.backoff.validate()
    }

    pub fn default_step_timeout(&self) -> Duration {
        Duration::from_millis(self.default_step_timeout_ms)
    }

    pub fn max_step_timeout(&self) -> Duration {
        Duration::from_millis(self.max_step_timeout_ms)
    }

    pub fn cancellation_grace_period(&self) -> Duration {
        Duration::from_millis(self.cancellation_grace_period_ms)
    }

    /// The declared timeout, or the default, clamped to the maximum
    pub fn effective_timeout(&self, declared: Option<Duration>) -> Duration {
        declared
            .unwrap_or_else(|| self.default_step_timeout())
            .min(self.max_step_timeout())
    }

    pub fn with_max_concurrent_steps(mut self, max: usize) -> Self {
        self.max_concurrent_steps = max;
        self
    }

    pub fn with_default_step_timeout(mut self, timeout: Duration) -> Self {
        self.default_step_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_cancellation_grace_period(mut self, grace: Duration) -> Self {
        self.cancellation_grace_period_ms = duration_ms(grace);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Exponential retry backoff: `min(base * multiplier^(attempt - 1), max)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: constants::backoff::BASE_DELAY_MS,
            max_delay_ms: constants::backoff::MAX_DELAY_MS,
            multiplier: constants::backoff::MULTIPLIER,
        }
    }
}

impl BackoffConfig {
    pub fn new(base: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            base_delay_ms: duration_ms(base),
            max_delay_ms: duration_ms(max),
            multiplier,
        }
    }

    /// Retry immediately
    pub fn immediate() -> Self {
        Self {
            base_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "backoff.multiplier",
                self.multiplier,
                "must be a finite number >= 1.0",
            ));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(ConfigurationError::invalid_value(
                "backoff.base_delay_ms",
                self.base_delay_ms,
                format!("exceeds backoff.max_delay_ms ({})", self.max_delay_ms),
            ));
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
