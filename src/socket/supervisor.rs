use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use crate::error::{ConfigError, ConnectError};
use crate::events::{EventBus, Handler, ReconnectNotice, SocketEvent, SocketEventKind};
use crate::socket::config::SocketConfig;
use crate::transport::{
    CloseFrame, SocketConnect, SocketLink, SocketParts, SocketSignal, ABNORMAL_CLOSE_CODE,
    NORMAL_CLOSE_CODE,
};

/// Lifecycle of the supervised link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LinkPhase {
    /// No connection has ever been requested.
    Idle,
    /// A dial is in flight.
    Connecting,
    /// The link is established and messages flow.
    Open,
    /// The caller asked to close; waiting for the close frame.
    Closing,
    /// The link is down.
    Closed,
}

/// Why the supervisor stopped reconnecting for good.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TerminalKind {
    /// The backend declared this client build stale.
    VersionExpired,
    /// The attempt budget is spent.
    Exhausted,
}

/// Point-in-time snapshot of a supervisor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketStatus {
    /// `true` while the link is open.
    pub connected: bool,
    /// Reconnect attempts consumed since the last successful open.
    pub attempts: u32,
    /// Attempt budget from the configured policy.
    pub max_attempts: u32,
}

/// A scheduled reconnect, waiting out its delay.
struct RetryTimer {
    delay_ms: u64,
    handle: JoinHandle<()>,
}

struct LinkState {
    phase: LinkPhase,
    attempts: u32,
    terminal: Option<TerminalKind>,
    manual_close: bool,
    url: Option<String>,
    protocols: Vec<String>,
    config: SocketConfig,
    /// Bumped by `connect`; tasks carrying an older value are stale and
    /// must not touch state or emit.
    generation: u64,
    pump: Option<JoinHandle<()>>,
    retry: Option<RetryTimer>,
    /// Delay of a retry suspended by [`SocketSupervisor::network_offline`],
    /// kept so `network_online` can re-arm it unchanged.
    suspended_retry: Option<u64>,
}

impl LinkState {
    fn new(config: SocketConfig) -> Self {
        Self {
            phase: LinkPhase::Idle,
            attempts: 0,
            terminal: None,
            manual_close: false,
            url: None,
            protocols: Vec::new(),
            config,
            generation: 0,
            pump: None,
            retry: None,
            suspended_retry: None,
        }
    }
}

struct SocketInner {
    connector: Arc<dyn SocketConnect>,
    bus: EventBus<SocketEvent>,
    state: Mutex<LinkState>,
    /// The live link half, behind an async lock because send and close
    /// handshakes await the transport.
    link: tokio::sync::Mutex<Option<Box<dyn SocketLink>>>,
}

/// Supervises one streaming connection and carries it across failures.
///
/// The supervisor owns the full lifecycle: it dials through the injected
/// [`SocketConnect`], pumps transport signals into [`SocketEvent`]s, and
/// decides after every close whether to stay down or schedule another dial.
/// Abnormal closes burn through a fixed delay table until either a dial
/// succeeds (which refunds the whole budget) or the budget is spent. Two
/// conditions latch the supervisor permanently: the version-expiry close
/// from the backend, and budget exhaustion. After either one,
/// [`connect`](SocketSupervisor::connect) returns
/// [`ConnectError::Terminal`] and the host must rebuild the supervisor,
/// usually after reloading itself.
///
/// Handlers subscribed through [`on`](SocketSupervisor::on) run
/// synchronously in registration order; see [`EventBus`] for the dispatch
/// contract. Cloning is cheap and every clone drives the same connection.
///
/// Dropping all clones does not close an open link. Call
/// [`close`](SocketSupervisor::close) first.
///
/// # Example
/// ```no_run
/// use roomlink::{SocketConnect, SocketEventKind, SocketSupervisor};
///
/// # async fn demo(connector: impl SocketConnect) -> Result<(), roomlink::ConnectError> {
/// let socket = SocketSupervisor::new(connector);
/// socket.on_fn(SocketEventKind::Message, |event| println!("{event:?}"));
/// socket
///     .connect("wss://game.example/room/42", vec!["overlay-v1".into()])
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SocketSupervisor {
    inner: Arc<SocketInner>,
}

impl SocketSupervisor {
    /// Creates a supervisor with the default reconnect policy.
    pub fn new(connector: impl SocketConnect) -> Self {
        Self::build(Arc::new(connector), SocketConfig::default())
    }

    /// Creates a supervisor from an already-shared connector.
    pub fn from_arc(connector: Arc<dyn SocketConnect>) -> Self {
        Self::build(connector, SocketConfig::default())
    }

    /// Creates a supervisor with an explicit reconnect policy.
    ///
    /// # Errors
    /// Returns [`ConfigError::EmptyBackoffTable`] or
    /// [`ConfigError::ZeroMaxAttempts`] when the policy is unusable.
    pub fn with_config(
        connector: impl SocketConnect,
        config: SocketConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(Arc::new(connector), config))
    }

    fn build(connector: Arc<dyn SocketConnect>, config: SocketConfig) -> Self {
        Self {
            inner: Arc::new(SocketInner {
                connector,
                bus: EventBus::new(),
                state: Mutex::new(LinkState::new(config)),
                link: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Dials `url`, tearing down any existing link or pending retry first.
    ///
    /// The dial itself runs in a background task; this returns once the
    /// attempt is underway. Progress arrives as events: `Open` on success,
    /// or `Error` plus an abnormal `Close` (which feeds the reconnect
    /// machinery) on failure. The url and protocols are remembered and
    /// reused by every automatic re-dial.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// [`ConfigError::MissingUrl`] when `url` is empty, and
    /// [`ConnectError::Terminal`] once the supervisor has latched.
    pub async fn connect(&self, url: &str, protocols: Vec<String>) -> Result<(), ConnectError> {
        if url.is_empty() {
            return Err(ConnectError::Config(ConfigError::MissingUrl));
        }
        let gen = {
            let mut st = self.inner.state();
            if st.terminal.is_some() {
                return Err(ConnectError::Terminal);
            }
            st.generation += 1;
            if let Some(timer) = st.retry.take() {
                timer.handle.abort();
            }
            if let Some(pump) = st.pump.take() {
                pump.abort();
            }
            st.suspended_retry = None;
            st.manual_close = false;
            st.phase = LinkPhase::Connecting;
            st.url = Some(url.to_string());
            st.protocols = protocols.clone();
            st.generation
        };
        // A superseded link is closed quietly; its pump is already gone,
        // so no close event reaches the bus for it.
        if let Some(mut old) = self.inner.link.lock().await.take() {
            let _ = old.close(NORMAL_CLOSE_CODE, "superseded").await;
        }
        tracing::info!(%url, "connecting");
        let inner = self.inner.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            inner.dial(gen, url, protocols).await;
        });
        Ok(())
    }

    /// Sends a text frame over the open link.
    ///
    /// Returns `false` without sending when the link is not open. A
    /// transport failure emits an `Error` event and also returns `false`.
    pub async fn send(&self, data: &str) -> bool {
        if self.inner.state().phase != LinkPhase::Open {
            tracing::debug!("send skipped; socket not open");
            return false;
        }
        let mut slot = self.inner.link.lock().await;
        let Some(link) = slot.as_mut() else {
            return false;
        };
        match link.send(data).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "send failed");
                drop(slot);
                self.inner.bus.emit(&SocketEvent::Error {
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    /// Closes the link on purpose, suppressing any reconnect.
    ///
    /// Cancels a pending retry, marks the close as caller-initiated, and
    /// starts the close handshake when a link is up. The final `Close`
    /// event is emitted when the transport delivers its close frame. The
    /// supervisor does not latch: a later [`connect`](Self::connect)
    /// starts over.
    pub async fn close(&self, code: u16, reason: &str) {
        {
            let mut st = self.inner.state();
            st.manual_close = true;
            st.suspended_retry = None;
            if let Some(timer) = st.retry.take() {
                timer.handle.abort();
            }
            if matches!(st.phase, LinkPhase::Connecting | LinkPhase::Open) {
                st.phase = LinkPhase::Closing;
            }
        }
        let mut slot = self.inner.link.lock().await;
        if let Some(link) = slot.as_mut() {
            tracing::info!(code, "closing socket");
            if let Err(err) = link.close(code, reason).await {
                tracing::warn!(error = %err, "close handshake failed");
            }
        }
    }

    /// Tells the supervisor the host lost network connectivity.
    ///
    /// A pending retry is suspended rather than burned: its delay is kept
    /// and nothing is attempted until [`network_online`](Self::network_online).
    pub fn network_offline(&self) {
        let mut st = self.inner.state();
        if let Some(timer) = st.retry.take() {
            timer.handle.abort();
            st.suspended_retry = Some(timer.delay_ms);
            tracing::info!(delay_ms = timer.delay_ms, "network offline; retry suspended");
        }
    }

    /// Tells the supervisor connectivity is back.
    ///
    /// Forgives two consumed attempts, since failures during an outage say
    /// nothing about the backend, and re-arms a suspended retry with its
    /// original delay. A latched or caller-closed supervisor ignores the
    /// hint entirely; its counters stay as they were.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn network_online(&self) {
        let mut st = self.inner.state();
        if st.terminal.is_some() || st.manual_close {
            st.suspended_retry = None;
            return;
        }
        st.attempts = st.attempts.saturating_sub(2);
        if let Some(delay_ms) = st.suspended_retry.take() {
            tracing::info!(delay_ms, "network online; retry re-armed");
            let gen = st.generation;
            let inner = self.inner.clone();
            st.retry = Some(RetryTimer {
                delay_ms,
                handle: tokio::spawn(async move {
                    time::sleep(Duration::from_millis(delay_ms)).await;
                    inner.fire_retry(gen).await;
                }),
            });
        }
    }

    /// Snapshot of the connection and its attempt budget.
    pub fn status(&self) -> SocketStatus {
        let st = self.inner.state();
        SocketStatus {
            connected: st.phase == LinkPhase::Open,
            attempts: st.attempts,
            max_attempts: st.config.max_attempts,
        }
    }

    /// Subscribes `handler` to events of `kind`.
    pub fn on(&self, kind: SocketEventKind, handler: Handler<SocketEvent>) {
        self.inner.bus.on(kind, handler);
    }

    /// Wraps `f` into a [`Handler`], subscribes it, and returns it for a
    /// later [`off`](Self::off).
    pub fn on_fn(
        &self,
        kind: SocketEventKind,
        f: impl Fn(&SocketEvent) + Send + Sync + 'static,
    ) -> Handler<SocketEvent> {
        self.inner.bus.on_fn(kind, f)
    }

    /// Unsubscribes a handler previously registered for `kind`.
    pub fn off(&self, kind: SocketEventKind, handler: &Handler<SocketEvent>) -> bool {
        self.inner.bus.off(kind, handler)
    }
}

impl std::fmt::Debug for SocketSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketSupervisor")
            .field("status", &self.status())
            .finish()
    }
}

impl SocketInner {
    fn state(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn stale(&self, gen: u64) -> bool {
        self.state().generation != gen
    }

    /// Drops the link half without a close handshake, so long as this
    /// connection still owns the slot. Used when the transport already
    /// reported the link dead. Staleness is checked under the slot lock,
    /// which serializes the take against a superseding install.
    async fn drop_link(&self, gen: u64) {
        let mut slot = self.link.lock().await;
        if self.stale(gen) {
            return;
        }
        *slot = None;
    }

    /// Dials the remembered url and installs the resulting link.
    async fn dial(self: Arc<Self>, gen: u64, url: String, protocols: Vec<String>) {
        {
            let mut st = self.state();
            if st.generation != gen {
                return;
            }
            st.phase = LinkPhase::Connecting;
        }
        tracing::debug!(%url, "dialing");
        match self.connector.connect(&url, &protocols).await {
            Ok(SocketParts { mut link, signals }) => {
                enum Verdict {
                    Install,
                    Superseded,
                    ManuallyClosed,
                }
                // Holding the link lock across the check and the store
                // keeps a concurrent teardown from slipping between them:
                // it must wait for the slot, then finds our link and
                // closes it.
                let mut slot = self.link.lock().await;
                let verdict = {
                    let st = self.state();
                    if st.generation != gen {
                        Verdict::Superseded
                    } else if st.manual_close {
                        Verdict::ManuallyClosed
                    } else {
                        Verdict::Install
                    }
                };
                match verdict {
                    Verdict::Install => {
                        *slot = Some(link);
                        drop(slot);
                        let mut st = self.state();
                        if st.generation == gen {
                            st.pump = Some(tokio::spawn(self.clone().pump(gen, signals)));
                        }
                        // else: the superseder already bumped the
                        // generation and will take the stored link.
                    }
                    Verdict::Superseded => {
                        drop(slot);
                        let _ = link.close(NORMAL_CLOSE_CODE, "superseded").await;
                    }
                    Verdict::ManuallyClosed => {
                        drop(slot);
                        let _ = link
                            .close(NORMAL_CLOSE_CODE, "closed before established")
                            .await;
                        self.handle_close(
                            gen,
                            CloseFrame::clean(NORMAL_CLOSE_CODE, "closed before established"),
                        );
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "dial failed");
                self.bus.emit(&SocketEvent::Error {
                    reason: err.to_string(),
                });
                // A failed dial runs through the same close path as a
                // dropped link so the backoff table applies uniformly.
                self.handle_close(gen, CloseFrame::abnormal(err.to_string()));
            }
        }
    }

    /// Forwards transport signals to the bus until the link dies.
    async fn pump(self: Arc<Self>, gen: u64, mut signals: mpsc::Receiver<SocketSignal>) {
        while let Some(signal) = signals.recv().await {
            match signal {
                SocketSignal::Open => {
                    {
                        let mut st = self.state();
                        if st.generation != gen {
                            return;
                        }
                        st.phase = LinkPhase::Open;
                        st.attempts = 0;
                        st.suspended_retry = None;
                        if let Some(timer) = st.retry.take() {
                            timer.handle.abort();
                        }
                    }
                    tracing::info!("socket open");
                    self.bus.emit(&SocketEvent::Open);
                }
                SocketSignal::Message { data } => {
                    if self.stale(gen) {
                        return;
                    }
                    self.bus.emit(&SocketEvent::Message { data });
                }
                SocketSignal::Error { reason } => {
                    if self.stale(gen) {
                        return;
                    }
                    tracing::warn!(%reason, "socket transport error");
                    self.bus.emit(&SocketEvent::Error { reason });
                }
                SocketSignal::Close(frame) => {
                    self.drop_link(gen).await;
                    self.handle_close(gen, frame);
                    return;
                }
            }
        }
        // The transport hung up without a close frame. Browsers report
        // this as code 1006; synthesizing the same shape keeps every
        // failure on the one close path.
        self.drop_link(gen).await;
        self.handle_close(gen, CloseFrame::abnormal("connection lost"));
    }

    /// Runs a scheduled reconnect once its delay has elapsed.
    async fn fire_retry(self: Arc<Self>, gen: u64) {
        let (url, protocols) = {
            let mut st = self.state();
            if st.generation != gen || st.terminal.is_some() || st.manual_close {
                return;
            }
            st.retry = None;
            match st.url.clone() {
                Some(url) => (url, st.protocols.clone()),
                None => return,
            }
        };
        self.dial(gen, url, protocols).await;
    }

    /// The single close path: every link death lands here, whether the
    /// transport closed, the dial failed, or the channel just died.
    ///
    /// Emits the `Close` event, classifies the frame, and either stays
    /// down (manual or clean close), latches (version expiry, spent
    /// budget), or arms the next retry. Classification and timer arming
    /// happen under one state lock so a handler reacting to the emitted
    /// events observes the final state.
    fn handle_close(self: Arc<Self>, gen: u64, frame: CloseFrame) {
        let mut events: Vec<SocketEvent> = Vec::with_capacity(2);
        {
            let mut st = self.state();
            if st.generation != gen {
                return;
            }
            st.phase = LinkPhase::Closed;
            st.pump = None;
            events.push(SocketEvent::from(&frame));

            if st.manual_close {
                tracing::info!(code = frame.code, "socket closed by caller");
            } else if st.terminal.is_some() {
                // Already latched; deliver the close event and nothing else.
            } else if frame.code == st.config.version_expired_code
                || reason_mentions_version_expiry(&frame.reason)
            {
                st.terminal = Some(TerminalKind::VersionExpired);
                tracing::warn!(
                    code = frame.code,
                    reason = %frame.reason,
                    "client version expired; reconnect disabled"
                );
                events.push(SocketEvent::Reconnect(ReconnectNotice::VersionExpired {
                    code: frame.code,
                    reason: frame.reason.clone(),
                }));
            } else if frame.was_clean
                && frame.code != ABNORMAL_CLOSE_CODE
                && !reason_mentions_update(&frame.reason)
            {
                tracing::info!(code = frame.code, "clean close; staying down");
            } else if st.attempts >= st.config.max_attempts {
                st.terminal = Some(TerminalKind::Exhausted);
                tracing::warn!(attempts = st.attempts, "reconnect attempts exhausted");
                events.push(SocketEvent::Reconnect(ReconnectNotice::MaxAttempts {
                    attempts: st.attempts,
                }));
            } else {
                let delay_ms = st.config.delay_for(st.attempts);
                st.attempts += 1;
                tracing::info!(
                    attempt = st.attempts,
                    max_attempts = st.config.max_attempts,
                    delay_ms,
                    "reconnect scheduled"
                );
                events.push(SocketEvent::Reconnect(ReconnectNotice::Scheduled {
                    attempt: st.attempts,
                    max_attempts: st.config.max_attempts,
                    delay_ms,
                    code: frame.code,
                    reason: frame.reason.clone(),
                }));
                let inner = self.clone();
                st.retry = Some(RetryTimer {
                    delay_ms,
                    handle: tokio::spawn(async move {
                        time::sleep(Duration::from_millis(delay_ms)).await;
                        inner.fire_retry(gen).await;
                    }),
                });
            }
        }
        for event in &events {
            self.bus.emit(event);
        }
    }
}

/// Matches any reasonable spelling of "version expired": case-insensitive,
/// with separators between the two words ignored.
fn reason_mentions_version_expiry(reason: &str) -> bool {
    let folded: String = reason
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    folded.contains("versionexpired")
}

/// Close reasons mentioning an update mean the backend is about to bounce;
/// such a close is treated as reconnectable even when it looks clean.
fn reason_mentions_update(reason: &str) -> bool {
    reason.to_ascii_lowercase().contains("update")
}
