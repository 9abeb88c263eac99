//! # Reconnect policy configuration.
//!
//! [`SocketConfig`] fixes how a supervisor answers abnormal closes: a
//! bounded attempt budget, a table of delays, and the close code the
//! backend uses to declare this client build expired. The policy is set at
//! construction and never changes for the life of the supervisor.

use crate::error::ConfigError;

/// Default reconnect attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Default reconnect delay table in milliseconds, indexed by attempts
/// already consumed and clamped to its last entry.
pub const DEFAULT_BACKOFF_TABLE_MS: [u64; 6] = [1_000, 2_000, 4_000, 8_000, 16_000, 32_000];

/// Close code the backend sends when the client build is stale.
///
/// Part of the wire contract: both ends must agree on it. A matching close
/// *reason* (any spelling of "version expired") triggers the same terminal
/// handling even when the code differs.
pub const VERSION_EXPIRED_CODE: u16 = 4710;

/// Reconnect policy for one supervisor.
///
/// # Example
/// ```
/// use roomlink::SocketConfig;
///
/// let config = SocketConfig::new()
///     .with_max_attempts(3)
///     .with_backoff_table(vec![500, 1_000, 5_000]);
/// assert_eq!(config.max_attempts, 3);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketConfig {
    /// How many reconnects may be scheduled before the supervisor gives
    /// up for good. Must be at least 1.
    pub max_attempts: u32,

    /// Delay table in milliseconds. Attempt `n` (1-based) sleeps
    /// `table[n - 1]`, clamped to the last entry when the budget outruns
    /// the table. Must be non-empty.
    pub backoff_table_ms: Vec<u64>,

    /// Close code treated as the version-expiry sentinel.
    pub version_expired_code: u16,
}

impl Default for SocketConfig {
    /// Returns the production policy: 6 attempts over
    /// `[1000, 2000, 4000, 8000, 16000, 32000]` ms, sentinel code 4710.
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_table_ms: DEFAULT_BACKOFF_TABLE_MS.to_vec(),
            version_expired_code: VERSION_EXPIRED_CODE,
        }
    }
}

impl SocketConfig {
    /// The default policy; equivalent to `SocketConfig::default()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Replaces the delay table.
    pub fn with_backoff_table(mut self, backoff_table_ms: Vec<u64>) -> Self {
        self.backoff_table_ms = backoff_table_ms;
        self
    }

    /// Overrides the version-expiry close code.
    pub fn with_version_expired_code(mut self, code: u16) -> Self {
        self.version_expired_code = code;
        self
    }

    /// Delay before the next attempt, given how many attempts are already
    /// consumed. Indexes the table directly so the first reconnect waits
    /// `table[0]`; past the end it sticks to the last entry.
    pub(crate) fn delay_for(&self, attempts_consumed: u32) -> u64 {
        let last = self.backoff_table_ms.len() - 1;
        self.backoff_table_ms[(attempts_consumed as usize).min(last)]
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.backoff_table_ms.is_empty() {
            return Err(ConfigError::EmptyBackoffTable);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let config = SocketConfig::default();
        assert_eq!(config.max_attempts, 6);
        assert_eq!(
            config.backoff_table_ms,
            vec![1_000, 2_000, 4_000, 8_000, 16_000, 32_000]
        );
        assert_eq!(config.version_expired_code, 4710);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_delay_indexes_table_then_clamps() {
        let config = SocketConfig::default();
        assert_eq!(config.delay_for(0), 1_000, "first reconnect waits table[0]");
        assert_eq!(config.delay_for(1), 2_000);
        assert_eq!(config.delay_for(2), 4_000);
        assert_eq!(config.delay_for(5), 32_000);
        assert_eq!(config.delay_for(6), 32_000, "clamps to the last entry");
        assert_eq!(config.delay_for(100), 32_000);
    }

    #[test]
    fn test_budget_may_outrun_a_short_table() {
        let config = SocketConfig::new()
            .with_max_attempts(5)
            .with_backoff_table(vec![100, 200]);
        assert!(config.validate().is_ok());
        assert_eq!(config.delay_for(4), 200);
    }

    #[test]
    fn test_empty_table_rejected() {
        let config = SocketConfig::new().with_backoff_table(vec![]);
        assert_eq!(config.validate(), Err(ConfigError::EmptyBackoffTable));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = SocketConfig::new().with_max_attempts(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxAttempts));
    }
}
