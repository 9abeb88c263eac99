//! # The status-polling controller.
//!
//! [`RoomPoller`] keeps room status fresh with a self-rescheduling loop: one
//! driver task per run performs a tick (fetch → classify → emit), computes
//! the next delay from the outcome, sleeps, and repeats. There is no external
//! timer wheel; the loop *is* the timer, and cancelling the run cancels
//! whichever await it is parked on, in-flight fetch included.
//!
//! ## Architecture
//! ```text
//! start(config) ──► driver task ──► tick ──► ok?  ──► open (first) + update ──► sleep(jittered(base))
//!                        ▲           │ err ──► error ──► backoff = next_backoff(..) ──► sleep(jittered(backoff))
//!                        └───────────┴── loop until stop()/restart cancels
//! stop() ──► cancel + join driver ──► emit close        (nothing ever follows close)
//! ```
//!
//! ## Rules
//! - `open` fires once per run, on the first successful tick, before that
//!   tick's `update`.
//! - Every scheduled delay is jittered; failure delays never start below the
//!   1000ms floor and never exceed the configured ceiling.
//! - `stop()` joins the driver before emitting `close`, so no `update` or
//!   `error` can trail it.
//! - Run transitions serialize: however `start()` and `stop()` calls race,
//!   at most one driver exists, and each superseded run emits its `close`
//!   before the next run installs.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::{ConfigError, TransportError};
use crate::events::{EventBus, Handler, PollEvent, PollEventKind};
use crate::policies::{jittered, next_backoff};
use crate::poll::config::{PollConfig, DEFAULT_BASE_INTERVAL_MS};
use crate::transport::{parse_player_count, StatusFetch, StatusReport};

/// Snapshot of a poller's observable state.
///
/// Owned data, detached from the live run; holding one never blocks or
/// observes later mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollStatus {
    /// Whether a run is active.
    pub running: bool,
    /// Target of the current (or most recent) run.
    pub target: Option<String>,
    /// Configured steady cadence of that run.
    pub interval_ms: u64,
    /// Current failure backoff; 0 while healthy.
    pub backoff_ms: u64,
}

/// The status-polling controller.
///
/// Cloning is cheap and shares the controller: clones see the same run,
/// bus, and status.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use roomlink::{PollConfig, PollEventKind, RoomPoller, StatusFetch};
///
/// # async fn demo(fetch: Arc<dyn StatusFetch>) -> Result<(), roomlink::ConfigError> {
/// let poller = RoomPoller::from_arc(fetch);
/// poller.on_fn(PollEventKind::Update, |event| {
///     println!("room status: {event:?}");
/// });
/// poller.start(PollConfig::new("ROOM-7")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RoomPoller {
    inner: Arc<PollInner>,
}

struct PollInner {
    fetch: Arc<dyn StatusFetch>,
    bus: EventBus<PollEvent>,
    state: Mutex<RunState>,
    /// Serializes run transitions. Held across the whole of `start` and
    /// `stop`; never taken by the driver.
    transition: tokio::sync::Mutex<()>,
}

#[derive(Default)]
struct RunState {
    running: bool,
    opened_once: bool,
    backoff_ms: u64,
    config: Option<PollConfig>,
    driver: Option<JoinHandle<()>>,
    cancel: Option<CancellationToken>,
}

impl RoomPoller {
    /// Builds a poller over the given transport.
    pub fn new(fetch: impl StatusFetch) -> Self {
        Self::from_arc(Arc::new(fetch))
    }

    /// Builds a poller over an already-shared transport.
    pub fn from_arc(fetch: Arc<dyn StatusFetch>) -> Self {
        Self {
            inner: Arc::new(PollInner {
                fetch,
                bus: EventBus::new(),
                state: Mutex::new(RunState::default()),
                transition: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Starts a run with `config`, validating it first.
    ///
    /// If a run is already active it is stopped first, `close` event
    /// included; a restart is not an error. Racing `start` and `stop`
    /// calls serialize, so a superseded run is always fully torn down
    /// before the next installs. The new run's first tick executes
    /// immediately. A validation failure leaves any current run
    /// untouched.
    pub async fn start(&self, config: PollConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let _transition = self.inner.transition.lock().await;
        self.shutdown_run().await;

        tracing::info!(
            room = %config.target,
            interval_ms = config.base_interval_ms,
            "poll run starting"
        );

        let cancel = CancellationToken::new();
        let mut st = self.inner.state();
        st.running = true;
        st.opened_once = false;
        st.backoff_ms = 0;
        st.config = Some(config.clone());
        st.cancel = Some(cancel.clone());
        // Spawned under the state lock so the stored handle and token
        // become visible together.
        st.driver = Some(tokio::spawn(run_driver(self.inner.clone(), config, cancel)));
        Ok(())
    }

    /// Stops the current run.
    ///
    /// Cancels the driver (abandoning an in-flight fetch and any pending
    /// sleep), waits for it to finish, then emits `close`. No-op when idle;
    /// calling it twice emits one `close`. The last config stays visible
    /// through [`status`](Self::status).
    pub async fn stop(&self) {
        let _transition = self.inner.transition.lock().await;
        self.shutdown_run().await;
    }

    /// Returns an owned snapshot of the poller's state.
    pub fn status(&self) -> PollStatus {
        let st = self.inner.state();
        PollStatus {
            running: st.running,
            target: st.config.as_ref().map(|c| c.target.clone()),
            interval_ms: st
                .config
                .as_ref()
                .map_or(DEFAULT_BASE_INTERVAL_MS, |c| c.base_interval_ms),
            backoff_ms: st.backoff_ms,
        }
    }

    /// Subscribes `handler` to `kind`. Duplicates are allowed and run in
    /// registration order.
    pub fn on(&self, kind: PollEventKind, handler: Handler<PollEvent>) {
        self.inner.bus.on(kind, handler);
    }

    /// Subscribes a closure and returns the handle needed to
    /// [`off`](Self::off) it later.
    pub fn on_fn<F>(&self, kind: PollEventKind, f: F) -> Handler<PollEvent>
    where
        F: Fn(&PollEvent) + Send + Sync + 'static,
    {
        self.inner.bus.on_fn(kind, f)
    }

    /// Removes the first registration of `handler` under `kind`.
    pub fn off(&self, kind: PollEventKind, handler: &Handler<PollEvent>) -> bool {
        self.inner.bus.off(kind, handler)
    }

    /// Tears down the active run, if any, and emits `close` after the
    /// driver is fully gone. Returns whether a run was stopped. Callers
    /// hold the transition lock, which covers the gap between this
    /// teardown and any follow-up install.
    async fn shutdown_run(&self) -> bool {
        let (driver, cancel) = {
            let mut st = self.inner.state();
            if !st.running {
                return false;
            }
            st.running = false;
            (st.driver.take(), st.cancel.take())
        };

        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(driver) = driver {
            if let Err(join) = driver.await {
                if join.is_panic() {
                    tracing::error!("poll driver panicked");
                }
            }
        }

        {
            let mut st = self.inner.state();
            st.opened_once = false;
            st.backoff_ms = 0;
        }
        self.inner.bus.emit(&PollEvent::close());
        tracing::info!("poll run stopped");
        true
    }
}

impl PollInner {
    fn state(&self) -> MutexGuard<'_, RunState> {
        // No user code runs under this lock; a poisoned guard still holds
        // consistent data.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for RoomPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("RoomPoller")
            .field("running", &status.running)
            .field("target", &status.target)
            .field("backoff_ms", &status.backoff_ms)
            .finish()
    }
}

enum Tick {
    Success { players: u64, data: Value },
    Failure { reason: String },
}

fn classify(result: Result<StatusReport, TransportError>) -> Tick {
    match result {
        Err(err) => Tick::Failure {
            reason: err.to_string(),
        },
        Ok(report) => {
            if !report.ok {
                Tick::Failure {
                    reason: format!("HTTP {}", report.status),
                }
            } else if let Some(data) = report.parsed {
                Tick::Success {
                    players: parse_player_count(&data),
                    data,
                }
            } else {
                Tick::Failure {
                    reason: "unparseable status body".to_string(),
                }
            }
        }
    }
}

async fn run_driver(inner: Arc<PollInner>, config: PollConfig, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return,
            result = inner.fetch.fetch_status(&config.target) => result,
        };

        let delay_ms = match classify(result) {
            Tick::Success { players, data } => {
                let first = {
                    let mut st = inner.state();
                    if !st.running {
                        return;
                    }
                    let first = !st.opened_once;
                    st.opened_once = true;
                    st.backoff_ms = 0;
                    first
                };
                if first {
                    tracing::info!(room = %config.target, players, "poll opened");
                    inner.bus.emit(&PollEvent::open(players, data.clone()));
                }
                tracing::debug!(players, "room status updated");
                inner.bus.emit(&PollEvent::update(players, data));
                jittered(config.base_interval_ms, config.jitter_ms)
            }
            Tick::Failure { reason } => {
                let backoff_ms = {
                    let mut st = inner.state();
                    if !st.running {
                        return;
                    }
                    st.backoff_ms = next_backoff(st.backoff_ms, config.max_backoff_ms);
                    st.backoff_ms
                };
                tracing::warn!(%reason, backoff_ms, "poll tick failed; backing off");
                inner.bus.emit(&PollEvent::error(reason));
                jittered(backoff_ms, config.jitter_ms)
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = time::sleep(Duration::from_millis(delay_ms)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Clone)]
    struct ScriptedFetch {
        script: Arc<Mutex<VecDeque<Result<StatusReport, TransportError>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedFetch {
        fn new(script: Vec<Result<StatusReport, TransportError>>) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.into())),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusFetch for ScriptedFetch {
        async fn fetch_status(&self, _target: &str) -> Result<StatusReport, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(StatusReport::success(json!({ "numPlayers": 1 }))))
        }
    }

    #[derive(Clone)]
    struct BlockingFetch {
        entered: Arc<Notify>,
    }

    impl BlockingFetch {
        fn new() -> Self {
            Self {
                entered: Arc::new(Notify::new()),
            }
        }
    }

    #[async_trait]
    impl StatusFetch for BlockingFetch {
        async fn fetch_status(&self, _target: &str) -> Result<StatusReport, TransportError> {
            self.entered.notify_one();
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    fn record(poller: &RoomPoller) -> Arc<Mutex<Vec<PollEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            PollEventKind::Open,
            PollEventKind::Update,
            PollEventKind::Error,
            PollEventKind::Close,
        ] {
            let sink = log.clone();
            poller.on_fn(kind, move |event| sink.lock().unwrap().push(event.clone()));
        }
        log
    }

    async fn drain_until(log: &Arc<Mutex<Vec<PollEvent>>>, want: usize) {
        for _ in 0..1_000 {
            if log.lock().unwrap().len() >= want {
                return;
            }
            time::sleep(Duration::from_millis(25)).await;
        }
        panic!(
            "expected {} events, have {:?}",
            want,
            log.lock().unwrap().clone()
        );
    }

    fn no_jitter(target: &str) -> PollConfig {
        PollConfig::new(target).with_jitter(0)
    }

    #[test]
    fn test_status_defaults_before_first_start() {
        let poller = RoomPoller::new(ScriptedFetch::new(vec![]));
        let status = poller.status();
        assert!(!status.running);
        assert_eq!(status.target, None);
        assert_eq!(status.interval_ms, DEFAULT_BASE_INTERVAL_MS);
        assert_eq!(status.backoff_ms, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_any_tick() {
        let fetch = ScriptedFetch::new(vec![]);
        let poller = RoomPoller::new(fetch.clone());
        let log = record(&poller);

        let result = poller.start(PollConfig::new("")).await;
        assert_eq!(result, Err(ConfigError::MissingTarget));
        assert_eq!(fetch.calls(), 0);
        assert!(!poller.status().running);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_then_recovery_event_order() {
        let fetch = ScriptedFetch::new(vec![
            Err(TransportError::Request {
                detail: "offline".into(),
            }),
            Ok(StatusReport::failure(503)),
            Ok(StatusReport::success(json!({ "numPlayers": 3 }))),
        ]);
        let poller = RoomPoller::new(fetch.clone());
        let log = record(&poller);

        poller.start(no_jitter("R1")).await.unwrap();
        drain_until(&log, 4).await;

        let events = log.lock().unwrap().clone();
        assert!(
            matches!(&events[0], PollEvent::Error { reason, .. } if reason.contains("offline")),
            "first event should be the transport error, got {:?}",
            events[0]
        );
        assert!(
            matches!(&events[1], PollEvent::Error { reason, .. } if reason.contains("503")),
            "second event should be the HTTP failure, got {:?}",
            events[1]
        );
        assert!(matches!(&events[2], PollEvent::Open { players: 3, .. }));
        assert!(matches!(&events[3], PollEvent::Update { players: 3, .. }));
        assert_eq!(fetch.calls(), 3);
        assert_eq!(
            poller.status().backoff_ms,
            0,
            "recovery must reset the backoff"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_ok_with_unparseable_body_counts_as_failure() {
        let fetch = ScriptedFetch::new(vec![Ok(StatusReport {
            status: 200,
            ok: true,
            body: "<html>maintenance</html>".into(),
            parsed: None,
        })]);
        let poller = RoomPoller::new(fetch);
        let log = record(&poller);

        poller.start(no_jitter("R1")).await.unwrap();
        drain_until(&log, 1).await;

        let events = log.lock().unwrap().clone();
        assert!(matches!(&events[0], PollEvent::Error { .. }));
        assert_eq!(poller.status().backoff_ms, 1_000, "floor applies first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_fires_once_per_run_and_restart_begins_a_new_run() {
        let poller = RoomPoller::new(ScriptedFetch::new(vec![]));
        let log = record(&poller);

        poller.start(no_jitter("R1")).await.unwrap();
        drain_until(&log, 3).await; // open, update, update

        {
            let events = log.lock().unwrap();
            let opens = events
                .iter()
                .filter(|e| matches!(e, PollEvent::Open { .. }))
                .count();
            assert_eq!(opens, 1, "open must fire once per run: {events:?}");
        }

        poller.start(no_jitter("R2")).await.unwrap();
        drain_until(&log, 6).await; // + close, open, update

        let events = log.lock().unwrap().clone();
        assert!(
            matches!(&events[3], PollEvent::Close { .. }),
            "restart must close the prior run first, got {:?}",
            events[3]
        );
        assert!(
            matches!(&events[4], PollEvent::Open { .. }),
            "fresh run opens again, got {:?}",
            events[4]
        );
        assert_eq!(poller.status().target.as_deref(), Some("R2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_restart_leaves_current_run_untouched() {
        let poller = RoomPoller::new(ScriptedFetch::new(vec![]));
        let log = record(&poller);

        poller.start(no_jitter("R1")).await.unwrap();
        drain_until(&log, 2).await;

        let result = poller.start(PollConfig::new("")).await;
        assert_eq!(result, Err(ConfigError::MissingTarget));

        let status = poller.status();
        assert!(status.running, "old run must survive a rejected restart");
        assert_eq!(status.target.as_deref(), Some("R1"));
        let events = log.lock().unwrap();
        assert!(
            !events.iter().any(|e| matches!(e, PollEvent::Close { .. })),
            "no close may fire for a rejected restart: {events:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_racing_restarts_install_exactly_one_driver() {
        let fetch = ScriptedFetch::new(vec![]);
        let poller = RoomPoller::new(fetch.clone());
        let log = record(&poller);

        poller
            .start(no_jitter("R1").with_interval(1_000))
            .await
            .unwrap();
        drain_until(&log, 2).await;

        // Both restarts suspend at the driver join inside teardown; the
        // loser must wait out the winner instead of installing a second
        // driver over a half-finished transition.
        let a = tokio::spawn({
            let poller = poller.clone();
            async move { poller.start(no_jitter("R2").with_interval(1_000)).await }
        });
        let b = tokio::spawn({
            let poller = poller.clone();
            async move { poller.start(no_jitter("R3").with_interval(1_000)).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let closes = log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, PollEvent::Close { .. }))
            .count();
        assert_eq!(closes, 2, "each superseded run closes exactly once");

        // One driver at a 1000ms cadence with zero jitter fits at most six
        // fetches into the window; a leaked second driver would double it.
        let before = fetch.calls();
        time::sleep(Duration::from_millis(5_100)).await;
        let observed = fetch.calls() - before;
        assert!(
            (5..=6).contains(&observed),
            "expected a single driver's cadence, saw {observed} fetches"
        );

        let status = poller.status();
        assert!(status.running);
        assert!(
            matches!(status.target.as_deref(), Some("R2") | Some("R3")),
            "one racing config must win: {:?}",
            status.target
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_noop_when_idle() {
        let poller = RoomPoller::new(ScriptedFetch::new(vec![]));
        let log = record(&poller);

        poller.stop().await;
        assert!(log.lock().unwrap().is_empty(), "idle stop emits nothing");

        poller.start(no_jitter("R1")).await.unwrap();
        drain_until(&log, 2).await;
        poller.stop().await;
        poller.stop().await;

        let closes = log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, PollEvent::Close { .. }))
            .count();
        assert_eq!(closes, 1, "double stop emits a single close");

        let status = poller.status();
        assert!(!status.running);
        assert_eq!(status.target.as_deref(), Some("R1"), "last config retained");
        assert_eq!(status.backoff_ms, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_inflight_fetch_emits_only_close() {
        let fetch = BlockingFetch::new();
        let poller = RoomPoller::new(fetch.clone());
        let log = record(&poller);

        poller.start(no_jitter("R1")).await.unwrap();
        fetch.entered.notified().await; // fetch is now in flight

        poller.stop().await;

        let events = log.lock().unwrap().clone();
        assert_eq!(events.len(), 1, "only close may fire: {events:?}");
        assert!(matches!(&events[0], PollEvent::Close { .. }));
        assert!(!poller.status().running);

        // Nothing further arrives once the run is gone.
        time::sleep(Duration::from_millis(60_000)).await;
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_delays_fall_inside_jitter_window() {
        let poller = RoomPoller::new(ScriptedFetch::new(vec![]));
        let stamps: Arc<Mutex<Vec<time::Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = stamps.clone();
        poller.on_fn(PollEventKind::Update, move |_| {
            sink.lock().unwrap().push(time::Instant::now());
        });

        poller.start(PollConfig::new("R1")).await.unwrap(); // 5000ms + 500ms jitter
        for _ in 0..2_000 {
            if stamps.lock().unwrap().len() >= 4 {
                break;
            }
            time::sleep(Duration::from_millis(50)).await;
        }

        let stamps = stamps.lock().unwrap().clone();
        assert!(stamps.len() >= 4, "collected {} updates", stamps.len());
        for pair in stamps.windows(2) {
            let delta = pair[1].duration_since(pair[0]).as_millis() as u64;
            assert!(
                (5_000..=5_500).contains(&delta),
                "steady delay {delta}ms outside the jitter window"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_grow_between_failed_ticks() {
        let fetch = ScriptedFetch::new(vec![
            Ok(StatusReport::failure(500)),
            Ok(StatusReport::failure(500)),
            Ok(StatusReport::failure(500)),
            Ok(StatusReport::failure(500)),
        ]);
        let poller = RoomPoller::new(fetch);
        let stamps: Arc<Mutex<Vec<time::Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = stamps.clone();
        poller.on_fn(PollEventKind::Error, move |_| {
            sink.lock().unwrap().push(time::Instant::now());
        });

        poller.start(no_jitter("R1")).await.unwrap();
        for _ in 0..2_000 {
            if stamps.lock().unwrap().len() >= 4 {
                break;
            }
            time::sleep(Duration::from_millis(25)).await;
        }

        let stamps = stamps.lock().unwrap().clone();
        assert!(stamps.len() >= 4);
        let deltas: Vec<u64> = stamps
            .windows(2)
            .map(|p| p[1].duration_since(p[0]).as_millis() as u64)
            .collect();
        assert_eq!(deltas, vec![1_000, 2_000, 4_000], "floor then doubling");
    }
}
