//! Error types used by the roomlink controllers and transports.
//!
//! This module defines three error enums:
//!
//! - [`ConfigError`] — invalid configuration, rejected before anything runs.
//! - [`ConnectError`] — why a `connect()` call was refused.
//! - [`TransportError`] — transport-level failures (request, dial, send).
//!
//! Configuration problems are the only errors that cross a controller's public
//! boundary. Transport failures are answered internally by backoff and retry
//! and reach the host as `error` events, never as returned `Err` values.

use thiserror::Error;

/// # Invalid configuration.
///
/// Raised by [`RoomPoller::start`](crate::RoomPoller::start),
/// [`SocketSupervisor::connect`](crate::SocketSupervisor::connect), and
/// [`SocketSupervisor::with_config`](crate::SocketSupervisor::with_config)
/// when the supplied configuration cannot describe a valid run. Values are
/// never silently clamped into range.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Poll target is required and must be non-empty.
    #[error("poll target must be non-empty")]
    MissingTarget,

    /// Socket url is required and must be non-empty.
    #[error("socket url must be non-empty")]
    MissingUrl,

    /// Steady-state poll cadence must be at least one millisecond.
    #[error("base interval must be at least 1ms")]
    ZeroInterval,

    /// Backoff ceiling sits below the backoff floor.
    #[error("max backoff {max_ms}ms is below the {floor_ms}ms backoff floor")]
    CeilingBelowFloor {
        /// The rejected ceiling.
        max_ms: u64,
        /// The fixed backoff floor.
        floor_ms: u64,
    },

    /// Backoff ceiling sits below the steady-state interval.
    #[error("max backoff {max_ms}ms is below the base interval {base_ms}ms")]
    CeilingBelowInterval {
        /// The rejected ceiling.
        max_ms: u64,
        /// The configured steady interval.
        base_ms: u64,
    },

    /// Reconnect backoff table must contain at least one delay.
    #[error("reconnect backoff table must be non-empty")]
    EmptyBackoffTable,

    /// Reconnect attempt budget must be at least one.
    #[error("max reconnect attempts must be at least 1")]
    ZeroMaxAttempts,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use roomlink::ConfigError;
    ///
    /// assert_eq!(ConfigError::MissingTarget.as_label(), "config_missing_target");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingTarget => "config_missing_target",
            ConfigError::MissingUrl => "config_missing_url",
            ConfigError::ZeroInterval => "config_zero_interval",
            ConfigError::CeilingBelowFloor { .. } => "config_ceiling_below_floor",
            ConfigError::CeilingBelowInterval { .. } => "config_ceiling_below_interval",
            ConfigError::EmptyBackoffTable => "config_empty_backoff_table",
            ConfigError::ZeroMaxAttempts => "config_zero_max_attempts",
        }
    }
}

/// # Why a `connect()` call was refused.
///
/// A refusal leaves the supervisor untouched: no state changes, no events.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The url or reconnect options were invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The supervisor reached a terminal condition (version expiry or an
    /// exhausted attempt budget) and will never reconnect; build a new
    /// supervisor to try again.
    #[error("supervisor is terminal; construct a new one to reconnect")]
    Terminal,
}

impl ConnectError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConnectError::Config(e) => e.as_label(),
            ConnectError::Terminal => "connect_terminal",
        }
    }

    /// `true` when the refusal came from a terminal supervisor rather than
    /// bad input.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectError::Terminal)
    }
}

/// # Transport-level failures.
///
/// Produced by [`StatusFetch`](crate::StatusFetch) and
/// [`SocketConnect`](crate::SocketConnect) implementations. Controllers treat
/// every variant as recoverable: the failure is surfaced as an `error` event
/// and answered by the backoff policy.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// An HTTP status request could not be performed at all (network down,
    /// DNS, timeout). A reachable server answering 4xx/5xx is a report,
    /// not an error.
    #[error("status request failed: {detail}")]
    Request {
        /// The underlying failure description.
        detail: String,
    },

    /// Dialing the streaming endpoint failed before the link opened.
    #[error("dial failed: {detail}")]
    Dial {
        /// The underlying failure description.
        detail: String,
    },

    /// Sending on an established link failed.
    #[error("send failed: {detail}")]
    Send {
        /// The underlying failure description.
        detail: String,
    },
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use roomlink::TransportError;
    ///
    /// let err = TransportError::Dial { detail: "refused".into() };
    /// assert_eq!(err.as_label(), "transport_dial");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Request { .. } => "transport_request",
            TransportError::Dial { .. } => "transport_dial",
            TransportError::Send { .. } => "transport_send",
        }
    }
}
