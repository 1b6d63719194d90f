//! # System Constants
//!
//! Defaults and names that define the operational boundaries of the
//! orchestrator. Configuration falls back to these values.

/// Maximum number of steps executing at once across all runs
pub const DEFAULT_MAX_CONCURRENT_STEPS: usize = 8;

/// Applied to steps that declare no timeout (5 minutes)
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 300_000;

/// Upper clamp for any step timeout (1 hour)
pub const MAX_STEP_TIMEOUT_MS: u64 = 3_600_000;

/// How long in-flight units get to honour cancellation before being abandoned
pub const DEFAULT_CANCELLATION_GRACE_PERIOD_MS: u64 = 5_000;

pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1_000;

/// Retry backoff defaults. A zero base delay retries immediately.
pub mod backoff {
    pub const BASE_DELAY_MS: u64 = 0;
    pub const MAX_DELAY_MS: u64 = 30_000;
    pub const MULTIPLIER: f64 = 2.0;
}

/// Environment variables consulted by logging and configuration
pub mod env_vars {
    pub const ENVIRONMENT: &str = "HUNT_ENV";
    pub const LOG_FORMAT: &str = "HUNT_LOG_FORMAT";
    pub const CONFIG_PATH: &str = "HUNT_CONFIG_PATH";
    /// Prefix for configuration overrides, e.g. `HUNT__MAX_CONCURRENT_STEPS`
    pub const CONFIG_PREFIX: &str = "HUNT";
    pub const CONFIG_SEPARATOR: &str = "__";
}
