//! Delay policies for polling and reconnecting.
//!
//! This module groups the pure math that decides **how long** to wait before
//! the next poll tick or reconnect attempt. Nothing here sleeps, spawns, or
//! mutates; callers own all retry state.
//!
//! ## Contents
//! - [`next_backoff`] exponential failure backoff with a floor and a ceiling
//! - [`jittered`] uniform random add-on applied to every scheduled poll delay
//! - [`BACKOFF_FLOOR_MS`] the first delay after a healthy run starts failing
//!
//! ## Quick wiring
//! ```text
//! RoomPoller tick:
//!   ok  → delay = jittered(base_interval_ms, jitter_ms)
//!   err → backoff_ms = next_backoff(backoff_ms, max_backoff_ms)
//!         delay = jittered(backoff_ms, jitter_ms)
//! SocketSupervisor close-handling:
//!   delay = SocketConfig::delay_for(attempts)   // table lookup, no jitter
//! ```
//!
//! ## Defaults
//! - Floor: **1000ms** (first failure never retries faster than one second).
//! - The ceiling is caller-supplied and validated against the floor at
//!   `start()`; it is never clamped here.

mod backoff;
mod jitter;

pub use backoff::{next_backoff, BACKOFF_FLOOR_MS};
pub use jitter::jittered;
