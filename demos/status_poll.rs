//! # Example: status_poll
//!
//! Runs a [`RoomPoller`] against an in-memory status endpoint that fails
//! twice before recovering, showing how the retry delay doubles while the
//! room is unreachable and snaps back to the steady cadence afterwards.
//!
//! ## Flow
//! ```text
//! run_driver()
//!   ├─► fetch → Err("socket hang up")    → error, next try in ~300ms
//!   ├─► fetch → HTTP 503                 → error, next try in ~600ms
//!   ├─► fetch → 200 {"numPlayers": 3}    → open + update, backoff reset
//!   ├─► fetch → 200 {"numPlayers": 4}    → update (steady cadence)
//!   ├─► ...
//!   └─► stop() → close
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example status_poll
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use roomlink::{
    parse_player_count, PollConfig, PollEvent, PollEventKind, RoomPoller, StatusFetch,
    StatusReport, TransportError,
};

/// Plays back a scripted run of outcomes, then settles into healthy
/// responses with a rising player count.
struct ScriptedStatus {
    script: Mutex<VecDeque<Result<StatusReport, TransportError>>>,
    players: AtomicU64,
}

impl ScriptedStatus {
    fn new(script: Vec<Result<StatusReport, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            players: AtomicU64::new(2),
        }
    }
}

#[async_trait]
impl StatusFetch for ScriptedStatus {
    async fn fetch_status(&self, _target: &str) -> Result<StatusReport, TransportError> {
        if let Some(scripted) = self.script.lock().unwrap().pop_front() {
            return scripted;
        }
        let players = self.players.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(StatusReport::success(json!({ "numPlayers": players })))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("roomlink=debug")
        .init();

    // 1. Script two failures, then let the endpoint recover.
    let fetch = ScriptedStatus::new(vec![
        Err(TransportError::Request {
            detail: "socket hang up".into(),
        }),
        Ok(StatusReport::failure(503)),
    ]);

    // 2. Build the poller and subscribe to its lifecycle.
    let poller = RoomPoller::new(fetch);

    poller.on_fn(PollEventKind::Open, |event| {
        if let PollEvent::Open { players, .. } = event {
            println!("[open] room reachable, {players} player(s)");
        }
    });
    poller.on_fn(PollEventKind::Update, |event| {
        if let PollEvent::Update { data, .. } = event {
            println!("[update] {} player(s)", parse_player_count(data));
        }
    });
    poller.on_fn(PollEventKind::Error, |event| {
        if let PollEvent::Error { reason, .. } = event {
            println!("[error] {reason}");
        }
    });
    poller.on_fn(PollEventKind::Close, |_| println!("[close] poll run ended"));

    // 3. Short intervals so the demo finishes quickly.
    let config = PollConfig::new("https://game.example/api/status/42")
        .with_interval(300)
        .with_jitter(50)
        .with_max_backoff(2_000);
    poller.start(config).await?;

    // 4. Let a few cycles play out, then shut down.
    tokio::time::sleep(Duration::from_secs(3)).await;
    let status = poller.status();
    println!(
        "[main] stopping (running={}, backoff={}ms)",
        status.running, status.backoff_ms
    );
    poller.stop().await;

    println!("[main] done.");
    Ok(())
}
