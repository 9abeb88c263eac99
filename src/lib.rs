//! # roomlink
//!
//! **Roomlink** is the connection resilience layer for a room overlay.
//!
//! It keeps an overlay attached to its game room through two independent
//! loops: a polling controller that fetches coarse room status over HTTP,
//! and a supervisor that carries a streaming link across failures with a
//! bounded, table-driven reconnect. Both report through per-controller
//! event buses and both stay transport-agnostic; the host injects the
//! actual HTTP and socket implementations through small traits.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                  ┌────────────────────────────────┐
//!                  │         host / overlay         │
//!                  └────────┬───────────────┬───────┘
//!            start/stop     │               │     connect/send/close
//!                           ▼               ▼
//!                 ┌──────────────┐   ┌──────────────────┐
//!                 │  RoomPoller  │   │ SocketSupervisor │
//!                 │ (status loop)│   │ (streaming link) │
//!                 └──┬────────┬──┘   └──┬────────────┬──┘
//!                    │        │         │            │
//!        StatusFetch │        │         │            │ SocketConnect
//!                    ▼        │         │            ▼
//!          injected HTTP      │         │      injected socket
//!                             ▼         ▼
//!              EventBus<PollEvent>   EventBus<SocketEvent>
//!                             │         │
//!                             ▼         ▼
//!               host handlers (sync, registration order)
//! ```
//!
//! ### Lifecycle
//! ```text
//! poll loop:                         reconnect:
//!   fetch room status                  close frame arrives
//!   ├─ ok  ─► open? / update           ├─ caller closed      ─► stay down
//!   │        delay = base + jitter     ├─ version expired    ─► latch
//!   └─ err ─► error                    ├─ clean, no update   ─► stay down
//!            backoff doubles           ├─ budget spent       ─► latch
//!            delay = backoff + jitter  └─ else ─► sleep table[n] ─► dial
//! ```
//!
//! ## Features
//! | Area            | Description                                                | Key types / traits                              |
//! |-----------------|------------------------------------------------------------|-------------------------------------------------|
//! | **Polling**     | Self-correcting status loop with backoff and jitter.       | [`RoomPoller`], [`PollConfig`]                  |
//! | **Supervision** | Streaming link lifecycle with bounded reconnect.           | [`SocketSupervisor`], [`SocketConfig`]          |
//! | **Events**      | Ordered synchronous pub/sub, panic-isolated handlers.      | [`EventBus`], [`PollEvent`], [`SocketEvent`]    |
//! | **Policies**    | Pure delay arithmetic shared by both loops.                | [`next_backoff`], [`jittered`]                  |
//! | **Transports**  | Injected I/O seams, trivially mockable in tests.           | [`StatusFetch`], [`SocketConnect`]              |
//! | **Errors**      | Typed configuration, connect, and transport errors.        | [`ConfigError`], [`ConnectError`], [`TransportError`] |
//!
//! ## Example
//! ```rust
//! use roomlink::{PollConfig, PollEventKind, RoomPoller};
//! # use roomlink::{StatusFetch, StatusReport, TransportError};
//! #
//! # struct Fetch;
//! # #[async_trait::async_trait]
//! # impl StatusFetch for Fetch {
//! #     async fn fetch_status(&self, _target: &str) -> Result<StatusReport, TransportError> {
//! #         Ok(StatusReport::success(serde_json::json!({ "numPlayers": 3 })))
//! #     }
//! # }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // `Fetch` implements StatusFetch over the host's HTTP client.
//!     let poller = RoomPoller::new(Fetch);
//!
//!     poller.on_fn(PollEventKind::Update, |event| {
//!         println!("room status: {event:?}");
//!     });
//!
//!     poller
//!         .start(PollConfig::new("https://game.example/api/status/42"))
//!         .await?;
//!
//!     // ... the overlay runs; stop() when it unloads.
//!     poller.stop().await;
//!     Ok(())
//! }
//! ```
mod error;
mod events;
mod policies;
mod poll;
mod socket;
mod transport;

// ---- Public re-exports ----

pub use error::{ConfigError, ConnectError, TransportError};
pub use events::{
    BusEvent, EventBus, Handler, PollEvent, PollEventKind, ReconnectNotice, SocketEvent,
    SocketEventKind,
};
pub use policies::{jittered, next_backoff, BACKOFF_FLOOR_MS};
pub use poll::{
    PollConfig, PollStatus, RoomPoller, DEFAULT_BASE_INTERVAL_MS, DEFAULT_JITTER_MS,
    DEFAULT_MAX_BACKOFF_MS,
};
pub use socket::{
    SocketConfig, SocketStatus, SocketSupervisor, DEFAULT_BACKOFF_TABLE_MS, DEFAULT_MAX_ATTEMPTS,
    VERSION_EXPIRED_CODE,
};
pub use transport::{
    parse_player_count, CloseFrame, SocketConnect, SocketLink, SocketParts, SocketSignal,
    StatusFetch, StatusReport, ABNORMAL_CLOSE_CODE, NORMAL_CLOSE_CODE,
};
