//! # Status-polling lifecycle events.
//!
//! One run of the poller emits, in order: `Open` once (first successful
//! tick), `Update` on every successful tick including the first, `Error` on
//! every failed tick, and `Close` exactly once when the run stops. Nothing
//! follows `Close`.

use std::time::SystemTime;

use serde_json::Value;

use crate::events::bus::BusEvent;

/// Subscription keys for [`PollEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PollEventKind {
    /// First successful tick of a run.
    Open,
    /// A successful tick (every one, including the first).
    Update,
    /// A failed tick.
    Error,
    /// The run stopped.
    Close,
}

/// Events emitted by [`RoomPoller`](crate::RoomPoller).
#[derive(Clone, Debug, PartialEq)]
pub enum PollEvent {
    /// The run reached the backend for the first time.
    Open {
        /// When the first successful tick completed.
        at: SystemTime,
        /// Player count extracted from the payload.
        players: u64,
        /// The parsed status payload.
        data: Value,
    },

    /// Fresh status arrived.
    Update {
        /// Player count extracted from the payload.
        players: u64,
        /// The parsed status payload.
        data: Value,
        /// When the tick completed.
        at: SystemTime,
    },

    /// A tick failed (transport error, non-success status, or an
    /// unparseable body). The loop is already backing off.
    Error {
        /// Human-readable description of the failure.
        reason: String,
        /// When the tick failed.
        at: SystemTime,
    },

    /// The run stopped. Always the last event of a run.
    Close {
        /// When the run stopped.
        at: SystemTime,
    },
}

impl PollEvent {
    pub(crate) fn open(players: u64, data: Value) -> Self {
        PollEvent::Open {
            at: SystemTime::now(),
            players,
            data,
        }
    }

    pub(crate) fn update(players: u64, data: Value) -> Self {
        PollEvent::Update {
            players,
            data,
            at: SystemTime::now(),
        }
    }

    pub(crate) fn error(reason: impl Into<String>) -> Self {
        PollEvent::Error {
            reason: reason.into(),
            at: SystemTime::now(),
        }
    }

    pub(crate) fn close() -> Self {
        PollEvent::Close {
            at: SystemTime::now(),
        }
    }
}

impl BusEvent for PollEvent {
    type Kind = PollEventKind;

    fn kind(&self) -> PollEventKind {
        match self {
            PollEvent::Open { .. } => PollEventKind::Open,
            PollEvent::Update { .. } => PollEventKind::Update,
            PollEvent::Error { .. } => PollEventKind::Error,
            PollEvent::Close { .. } => PollEventKind::Close,
        }
    }
}
