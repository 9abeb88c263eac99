//! Controller events: types and per-controller bus.
//!
//! This module groups the event **data model** and the **bus** each
//! controller owns to notify the host of lifecycle changes. Events are the
//! entire outbound surface: hosts render, log, or escalate from them, and
//! nothing a handler does can break the controller that emitted.
//!
//! ## Contents
//! - [`EventBus`], [`BusEvent`], [`Handler`] ordered synchronous pub/sub
//! - [`PollEvent`], [`PollEventKind`] status-polling lifecycle events
//! - [`SocketEvent`], [`SocketEventKind`], [`ReconnectNotice`] streaming
//!   lifecycle and reconnect decisions
//!
//! ## Quick reference
//! - **Publishers**: `RoomPoller` (driver task + `stop()`), `SocketSupervisor`
//!   (signal pump, dial task, `send()` failures).
//! - **Consumers**: host callbacks registered through `on`/`off` on either
//!   controller.
//!
//! Dispatch is synchronous and in registration order; a panicking handler is
//! isolated and logged, and later handlers still run.

mod bus;
mod poll;
mod socket;

pub use bus::{BusEvent, EventBus, Handler};
pub use poll::{PollEvent, PollEventKind};
pub use socket::{ReconnectNotice, SocketEvent, SocketEventKind};
