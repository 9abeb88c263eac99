//! # Streaming-socket lifecycle events.
//!
//! Every transport close surfaces as `Close` first; what the supervisor
//! decided about it (retry, give up, version expired) follows as a
//! `Reconnect` notice. The discriminator is the closed [`ReconnectNotice`]
//! sum, not a string tag.

use crate::events::bus::BusEvent;
use crate::transport::CloseFrame;

/// Subscription keys for [`SocketEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocketEventKind {
    /// A connection finished its handshake.
    Open,
    /// An inbound frame arrived.
    Message,
    /// The transport reported an error, or a send failed.
    Error,
    /// The connection closed (any cause, including failed dials).
    Close,
    /// The supervisor decided what happens next.
    Reconnect,
}

/// Events emitted by [`SocketSupervisor`](crate::SocketSupervisor).
#[derive(Clone, Debug, PartialEq)]
pub enum SocketEvent {
    /// The connection is open. Fires exactly once per successful
    /// connection, before any `Message` from it; the attempt counter has
    /// already been reset when handlers run.
    Open,

    /// A text frame from the live connection.
    Message {
        /// Raw frame payload.
        data: String,
    },

    /// A transport-level error. Informational; the close that follows
    /// carries the classification.
    Error {
        /// Human-readable description.
        reason: String,
    },

    /// The connection closed. `code`/`was_clean`/`reason` are the
    /// transport's close frame, or a synthetic abnormal frame (1006) when
    /// the dial itself failed or the transport vanished without one.
    Close {
        /// Close code.
        code: u16,
        /// Whether the closure completed a closing handshake.
        was_clean: bool,
        /// Close reason text, possibly empty.
        reason: String,
    },

    /// The supervisor's verdict on a close: retry scheduled, version
    /// expired, or attempt budget exhausted.
    Reconnect(ReconnectNotice),
}

/// What the supervisor decided after classifying a close.
#[derive(Clone, Debug, PartialEq)]
pub enum ReconnectNotice {
    /// A reconnect attempt is armed.
    Scheduled {
        /// 1-based number of this attempt.
        attempt: u32,
        /// The configured attempt budget.
        max_attempts: u32,
        /// Delay before the re-dial, straight from the backoff table.
        delay_ms: u64,
        /// Close code that triggered the retry.
        code: u16,
        /// Close reason that triggered the retry.
        reason: String,
    },

    /// The backend declared this client build stale. Terminal: the host
    /// must prompt for a full reload; this supervisor never reconnects.
    VersionExpired {
        /// Close code carrying the sentinel (or the abnormal code when the
        /// reason text matched).
        code: u16,
        /// Close reason text.
        reason: String,
    },

    /// The attempt budget is spent. Fires at most once per supervisor;
    /// nothing is ever scheduled afterwards.
    MaxAttempts {
        /// Attempts consumed when the supervisor gave up.
        attempts: u32,
    },
}

impl From<&CloseFrame> for SocketEvent {
    fn from(frame: &CloseFrame) -> Self {
        SocketEvent::Close {
            code: frame.code,
            was_clean: frame.was_clean,
            reason: frame.reason.clone(),
        }
    }
}

impl BusEvent for SocketEvent {
    type Kind = SocketEventKind;

    fn kind(&self) -> SocketEventKind {
        match self {
            SocketEvent::Open => SocketEventKind::Open,
            SocketEvent::Message { .. } => SocketEventKind::Message,
            SocketEvent::Error { .. } => SocketEventKind::Error,
            SocketEvent::Close { .. } => SocketEventKind::Close,
            SocketEvent::Reconnect(_) => SocketEventKind::Reconnect,
        }
    }
}
