//! Transport seams: how controllers reach the network.
//!
//! Controllers never talk to HTTP or WebSocket APIs directly. Hosts inject
//! implementations of the traits here (a real client in production, scripted
//! mocks in tests and demos), and the controllers stay a pure scheduling and
//! classification layer.
//!
//! ## Contents
//! - [`StatusFetch`], [`StatusReport`] one-shot room-status requests
//! - [`SocketConnect`], [`SocketLink`], [`SocketParts`] dialing and using a
//!   streaming link
//! - [`SocketSignal`], [`CloseFrame`] inbound link lifecycle, `Close` last
//! - [`parse_player_count`] tolerant player-count extraction from payloads
//!
//! ## Contract highlights
//! - A reachable server answering 4xx/5xx is a [`StatusReport`] with
//!   `ok == false`, not an `Err`; only transport-level failures are errors.
//! - A link's signal channel delivers [`SocketSignal::Close`] as its final
//!   signal. If the channel drops without one, the supervisor synthesizes an
//!   abnormal close (code 1006) so no death goes unclassified.

mod fetch;
mod socket;

pub use fetch::{parse_player_count, StatusFetch, StatusReport};
pub use socket::{
    CloseFrame, SocketConnect, SocketLink, SocketParts, SocketSignal, ABNORMAL_CLOSE_CODE,
    NORMAL_CLOSE_CODE,
};
