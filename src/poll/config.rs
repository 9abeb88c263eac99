//! # Polling run configuration.
//!
//! [`PollConfig`] describes one run of the poller: what to poll and on what
//! cadence. A config is validated once at `start()` and then owned by the
//! run; it is never mutated mid-run, and the next `start()` replaces it
//! wholesale.

use crate::error::ConfigError;
use crate::policies::BACKOFF_FLOOR_MS;

/// Default steady-state cadence between successful polls.
pub const DEFAULT_BASE_INTERVAL_MS: u64 = 5_000;

/// Default upper bound of the random jitter added to every scheduled delay.
pub const DEFAULT_JITTER_MS: u64 = 500;

/// Default ceiling for failure backoff.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;

/// Configuration for one polling run.
///
/// # Example
/// ```
/// use roomlink::PollConfig;
///
/// let config = PollConfig::new("ROOM-7")
///     .with_interval(10_000)
///     .with_jitter(250);
/// assert_eq!(config.base_interval_ms, 10_000);
/// assert_eq!(config.max_backoff_ms, 30_000);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Room identifier to poll status for. Required, non-empty.
    pub target: String,

    /// Steady-state cadence in milliseconds. Must be at least 1.
    pub base_interval_ms: u64,

    /// Upper bound of the uniform random add-on applied to **every**
    /// scheduled delay, steady and backoff alike. Zero disables jitter.
    pub jitter_ms: u64,

    /// Ceiling for failure backoff. Must be at least the backoff floor
    /// (1000ms) and at least `base_interval_ms`. Out-of-range values are
    /// rejected at `start()`, never clamped.
    pub max_backoff_ms: u64,
}

impl PollConfig {
    /// A config for `target` with default cadence (5000ms interval, 500ms
    /// jitter, 30000ms backoff ceiling).
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            base_interval_ms: DEFAULT_BASE_INTERVAL_MS,
            jitter_ms: DEFAULT_JITTER_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }

    /// Sets the steady-state cadence.
    pub fn with_interval(mut self, base_interval_ms: u64) -> Self {
        self.base_interval_ms = base_interval_ms;
        self
    }

    /// Sets the jitter upper bound.
    pub fn with_jitter(mut self, jitter_ms: u64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    /// Sets the failure-backoff ceiling.
    pub fn with_max_backoff(mut self, max_backoff_ms: u64) -> Self {
        self.max_backoff_ms = max_backoff_ms;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.target.is_empty() {
            return Err(ConfigError::MissingTarget);
        }
        if self.base_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.max_backoff_ms < BACKOFF_FLOOR_MS {
            return Err(ConfigError::CeilingBelowFloor {
                max_ms: self.max_backoff_ms,
                floor_ms: BACKOFF_FLOOR_MS,
            });
        }
        if self.max_backoff_ms < self.base_interval_ms {
            return Err(ConfigError::CeilingBelowInterval {
                max_ms: self.max_backoff_ms,
                base_ms: self.base_interval_ms,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PollConfig::new("R1");
        assert_eq!(config.base_interval_ms, 5_000);
        assert_eq!(config.jitter_ms, 500);
        assert_eq!(config.max_backoff_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_target_rejected() {
        let config = PollConfig::new("");
        assert_eq!(config.validate(), Err(ConfigError::MissingTarget));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = PollConfig::new("R1").with_interval(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));
    }

    #[test]
    fn test_ceiling_below_floor_rejected_not_clamped() {
        let config = PollConfig::new("R1").with_interval(1).with_max_backoff(500);
        assert_eq!(
            config.validate(),
            Err(ConfigError::CeilingBelowFloor {
                max_ms: 500,
                floor_ms: 1_000,
            })
        );
    }

    #[test]
    fn test_ceiling_below_interval_rejected() {
        let config = PollConfig::new("R1")
            .with_interval(10_000)
            .with_max_backoff(5_000);
        assert_eq!(
            config.validate(),
            Err(ConfigError::CeilingBelowInterval {
                max_ms: 5_000,
                base_ms: 10_000,
            })
        );
    }

    #[test]
    fn test_ceiling_equal_to_interval_allowed() {
        let config = PollConfig::new("R1")
            .with_interval(2_000)
            .with_max_backoff(2_000);
        assert!(config.validate().is_ok());
    }
}
