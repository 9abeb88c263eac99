//! # Example: socket_reconnect
//!
//! Walks a [`SocketSupervisor`] through a full failure story with an
//! in-memory transport: the first link drops mid-session, the next dial is
//! refused, the one after that sticks, and the caller finally closes on
//! purpose. A second act shows the version-expiry latch.
//!
//! ## Flow
//! ```text
//! connect()
//!   ├─► dial #1 → open, message, then the link drops (1006)
//!   ├─► reconnect attempt 1/3 in 300ms
//!   ├─► dial #2 → refused → synthetic 1006
//!   ├─► reconnect attempt 2/3 in 600ms
//!   ├─► dial #3 → open, message, stays up
//!   ├─► send("who") over the recovered link
//!   └─► close(1000, "demo over") → close, no reconnect
//!
//! act two: a backend that closes with code 4710
//!   └─► version expired → latched → connect() = Err(Terminal)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example socket_reconnect
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use roomlink::{
    CloseFrame, ReconnectNotice, SocketConfig, SocketConnect, SocketEvent, SocketEventKind,
    SocketLink, SocketParts, SocketSignal, SocketSupervisor, TransportError, VERSION_EXPIRED_CODE,
};

struct DemoLink {
    signals: mpsc::Sender<SocketSignal>,
}

#[async_trait]
impl SocketLink for DemoLink {
    async fn send(&mut self, data: &str) -> Result<(), TransportError> {
        println!("[link] frame out: {data}");
        Ok(())
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        // Echo the handshake back, like a well-behaved peer.
        let _ = self
            .signals
            .send(SocketSignal::Close(CloseFrame::clean(code, reason)))
            .await;
        Ok(())
    }
}

/// Scripted by dial count: #1 opens then drops, #2 is refused, everything
/// after that opens and stays up.
struct FlakyConnect {
    dials: AtomicU64,
}

#[async_trait]
impl SocketConnect for FlakyConnect {
    async fn connect(&self, url: &str, _protocols: &[String]) -> Result<SocketParts, TransportError> {
        let n = self.dials.fetch_add(1, Ordering::Relaxed) + 1;
        println!("[net] dial #{n} to {url}");
        if n == 2 {
            return Err(TransportError::Dial {
                detail: "connection refused".into(),
            });
        }
        let (tx, rx) = mpsc::channel(16);
        let feeder = tx.clone();
        tokio::spawn(async move {
            let _ = feeder.send(SocketSignal::Open).await;
            let _ = feeder
                .send(SocketSignal::Message {
                    data: format!(r#"{{"players":{}}}"#, 4 + n),
                })
                .await;
            if n == 1 {
                tokio::time::sleep(Duration::from_millis(400)).await;
                let _ = feeder
                    .send(SocketSignal::Close(CloseFrame::abnormal("link dropped")))
                    .await;
            }
        });
        Ok(SocketParts::new(Box::new(DemoLink { signals: tx }), rx))
    }
}

/// A backend that considers this client build too old.
struct ExpiredConnect;

#[async_trait]
impl SocketConnect for ExpiredConnect {
    async fn connect(&self, _url: &str, _protocols: &[String]) -> Result<SocketParts, TransportError> {
        let (tx, rx) = mpsc::channel(4);
        let feeder = tx.clone();
        tokio::spawn(async move {
            let _ = feeder.send(SocketSignal::Open).await;
            let _ = feeder
                .send(SocketSignal::Close(CloseFrame::clean(
                    VERSION_EXPIRED_CODE,
                    "version expired",
                )))
                .await;
        });
        Ok(SocketParts::new(Box::new(DemoLink { signals: tx }), rx))
    }
}

fn watch(socket: &SocketSupervisor, tag: &'static str) {
    socket.on_fn(SocketEventKind::Open, move |_| println!("[{tag}] open"));
    socket.on_fn(SocketEventKind::Message, move |event| {
        if let SocketEvent::Message { data } = event {
            println!("[{tag}] message: {data}");
        }
    });
    socket.on_fn(SocketEventKind::Error, move |event| {
        if let SocketEvent::Error { reason } = event {
            println!("[{tag}] error: {reason}");
        }
    });
    socket.on_fn(SocketEventKind::Close, move |event| {
        if let SocketEvent::Close { code, was_clean, .. } = event {
            println!("[{tag}] close: code={code} clean={was_clean}");
        }
    });
    socket.on_fn(SocketEventKind::Reconnect, move |event| {
        let SocketEvent::Reconnect(notice) = event else {
            return;
        };
        match notice {
            ReconnectNotice::Scheduled {
                attempt,
                max_attempts,
                delay_ms,
                ..
            } => println!("[{tag}] reconnect {attempt}/{max_attempts} in {delay_ms}ms"),
            ReconnectNotice::VersionExpired { code, .. } => {
                println!("[{tag}] version expired (code {code}); reload required")
            }
            ReconnectNotice::MaxAttempts { attempts } => {
                println!("[{tag}] giving up after {attempts} attempts")
            }
        }
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("roomlink=debug")
        .init();

    // Act one: drop, refusal, recovery, manual close. A short delay table
    // keeps the demo snappy.
    let socket = SocketSupervisor::with_config(
        FlakyConnect {
            dials: AtomicU64::new(0),
        },
        SocketConfig::new()
            .with_max_attempts(3)
            .with_backoff_table(vec![300, 600, 1_200]),
    )?;
    watch(&socket, "room");

    socket
        .connect("wss://game.example/room/42", vec!["overlay-v1".into()])
        .await?;

    // Wait out the drop (400ms), one refused dial, and the recovery.
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    let status = socket.status();
    println!(
        "[main] recovered: connected={} attempts={}",
        status.connected, status.attempts
    );
    socket.send("who").await;
    socket.close(1000, "demo over").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Act two: the backend declares this build stale.
    let stale = SocketSupervisor::new(ExpiredConnect);
    watch(&stale, "stale");
    stale.connect("wss://game.example/room/42", vec![]).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    match stale.connect("wss://game.example/room/42", vec![]).await {
        Err(err) if err.is_terminal() => println!("[main] supervisor latched: {err}"),
        other => println!("[main] unexpected: {other:?}"),
    }

    println!("[main] done.");
    Ok(())
}
