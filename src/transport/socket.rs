//! # Dialing and using a streaming link.
//!
//! A [`SocketConnect`] dials one connection and hands back [`SocketParts`]:
//! the send/close half ([`SocketLink`]) and a channel of inbound
//! [`SocketSignal`]s. The supervisor owns both; hosts never touch a link
//! directly.
//!
//! ## Signal ordering contract
//! ```text
//! Open → Message* / Error* → Close(frame)     (Close is final)
//! ```
//! Implementations send `Close` as the last signal of a connection's life.
//! A dropped channel without one is treated as an abnormal close (1006) by
//! the supervisor.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Close code for a normal, intentional closure.
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// Close code for a connection dropped without a closing handshake.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// How a connection ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseFrame {
    /// Close code.
    pub code: u16,
    /// Whether the closure completed a closing handshake.
    pub was_clean: bool,
    /// Close reason text, possibly empty.
    pub reason: String,
}

impl CloseFrame {
    /// A clean closure with the given code and reason.
    pub fn clean(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            was_clean: true,
            reason: reason.into(),
        }
    }

    /// An abnormal closure (code 1006, not clean).
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: ABNORMAL_CLOSE_CODE,
            was_clean: false,
            reason: reason.into(),
        }
    }
}

/// Inbound lifecycle signals for one connection.
#[derive(Debug)]
pub enum SocketSignal {
    /// The handshake completed; the link is usable.
    Open,
    /// A text frame arrived.
    Message {
        /// Raw frame payload.
        data: String,
    },
    /// A transport-level error. Informational; a `Close` still follows.
    Error {
        /// Human-readable description.
        reason: String,
    },
    /// The connection ended. Always the final signal.
    Close(CloseFrame),
}

/// The send/close half of one dialed connection.
#[async_trait]
pub trait SocketLink: Send + Sync {
    /// Sends a text frame.
    async fn send(&mut self, data: &str) -> Result<(), TransportError>;

    /// Starts a closing handshake. The resulting [`SocketSignal::Close`]
    /// still arrives on the signal channel.
    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError>;
}

/// What a successful dial hands to the supervisor.
pub struct SocketParts {
    /// Send/close half of the connection.
    pub link: Box<dyn SocketLink>,
    /// Inbound signals, ending with `Close`.
    pub signals: mpsc::Receiver<SocketSignal>,
}

impl SocketParts {
    /// Bundles a link with its signal channel.
    pub fn new(link: Box<dyn SocketLink>, signals: mpsc::Receiver<SocketSignal>) -> Self {
        Self { link, signals }
    }
}

impl std::fmt::Debug for SocketParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketParts").finish_non_exhaustive()
    }
}

/// Dials streaming connections. One call, one connection; the supervisor
/// re-dials through the same connector when it reconnects.
#[async_trait]
pub trait SocketConnect: Send + Sync + 'static {
    /// Opens a connection to `url`, negotiating `protocols` when non-empty.
    async fn connect(&self, url: &str, protocols: &[String])
        -> Result<SocketParts, TransportError>;
}
