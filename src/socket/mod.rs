//! # Streaming connection supervision.
//!
//! One [`SocketSupervisor`] owns one logical room connection. The actual
//! transport is injected as a [`SocketConnect`](crate::SocketConnect)
//! factory, so the supervisor only reasons about lifecycle: dial, pump
//! signals, classify the close, and decide whether to dial again.
//!
//! ```text
//!               dial ok                 close frame
//!   connect() ──────────▶ link + pump ──────────────▶ classify
//!       ▲                                                │
//!       │                             ┌──────────────────┼────────────┐
//!       │ delay from table            │                  │            │
//!       └──────────── retry timer ◀── schedule     stay down      latch
//!                                                 (manual/clean) (expiry/
//!                                                                 budget)
//! ```
//!
//! Close classification, in order:
//! 1. caller asked for the close: stay down,
//! 2. version-expiry sentinel (code or reason): latch, notify,
//! 3. clean close with no update hint: stay down,
//! 4. attempt budget spent: latch, notify,
//! 5. otherwise: schedule a retry from the delay table.
//!
//! ## Contents
//! - [`SocketConfig`]: reconnect policy (budget, delay table, sentinel).
//! - [`SocketSupervisor`]: the supervisor itself.
//! - [`SocketStatus`]: point-in-time snapshot.

mod config;
mod supervisor;

pub use config::{
    SocketConfig, DEFAULT_BACKOFF_TABLE_MS, DEFAULT_MAX_ATTEMPTS, VERSION_EXPIRED_CODE,
};
pub use supervisor::{SocketStatus, SocketSupervisor};
