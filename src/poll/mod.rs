//! Status polling: configuration and the polling controller.
//!
//! ## Contents
//! - [`PollConfig`] what to poll and on what cadence (validated at start)
//! - [`RoomPoller`] the self-rescheduling polling loop
//! - [`PollStatus`] owned snapshot of a poller's state
//!
//! ## Lifecycle
//! ```text
//! start(config) ─► tick now ─► ok:  open¹ + update, steady cadence
//!        │                     err: error, backoff (floor 1000ms, ×2, ≤ ceiling)
//!        │                                    ¹ once per run
//!        └─► stop() ─► close   (final; restart repeats the cycle)
//! ```

mod config;
mod scheduler;

pub use config::{
    PollConfig, DEFAULT_BASE_INTERVAL_MS, DEFAULT_JITTER_MS, DEFAULT_MAX_BACKOFF_MS,
};
pub use scheduler::{PollStatus, RoomPoller};
