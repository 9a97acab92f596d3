//! The stream engine: a [`TipStream`] handle and the driver task behind it.
//!
//! ```text
//! idle ──(no contract; waits for reconnect)
//! connecting ──handshake──▶ connected ──close/error──▶ connecting (backoff)
//!      │                         │
//!      └──attempts ≥ max / push disabled / no push url──▶ polling ──3 failures──▶ error
//!                                                          │
//!                                            no rpc url ───┴──────────────────▶ error
//! ```
//!
//! `reconnect()` and transport-mode changes restart the cycle from the top.
//! All state lives in the driver task; the handle only sends commands and
//! reads the published [`StreamState`].

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use tipstream_core::config::{StreamConfig, TransportSettings};
use tipstream_core::decoder::LogDecoder;
use tipstream_core::mode::TransportMode;
use tipstream_core::policy::ReconnectBackoff;
use tipstream_core::transport::{PushConnector, PushSession, RpcTransport};
use tipstream_core::types::{LogFilter, RawLog, StreamState, StreamStatus};

use crate::book::TipBook;
use crate::pull::LogPoller;
use crate::push::{self, PushFrame};

/// Consecutive non-rate-limit poll failures before the stream gives up.
pub const MAX_POLL_FAILURES: u32 = 3;

pub const NO_CONTRACT_MESSAGE: &str = "TipJar contract address is not configured.";
pub const NO_RPC_MESSAGE: &str = "No HTTP RPC configured for polling fallback.";
pub const PUSH_CLOSED_MESSAGE: &str = "Realtime connection closed.";

enum Command {
    Reconnect,
}

/// Handle to a running tip stream.
///
/// Dropping the handle cancels the driver; [`TipStream::dispose`] also waits
/// for it to release its connection.
pub struct TipStream {
    state: watch::Receiver<StreamState>,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

impl TipStream {
    /// Spawn the driver on the current tokio runtime.
    pub(crate) fn spawn(parts: DriverParts) -> Self {
        let initial = if parts.filter.is_some() {
            StreamState::new(StreamStatus::Connecting)
        } else {
            StreamState {
                error: Some(NO_CONTRACT_MESSAGE.into()),
                ..StreamState::new(StreamStatus::Idle)
            }
        };
        let (state_tx, state) = watch::channel(initial);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let max_pages = parts.config.settings(parts.mode).max_pages_per_tick;
        let driver = Driver {
            config: parts.config,
            filter: parts.filter,
            decoder: parts.decoder,
            push: parts.push,
            rpc: parts.rpc,
            backoff: parts.backoff,
            mode: parts.mode,
            modes: parts.modes,
            commands: command_rx,
            cancel: cancel.clone(),
            state: state_tx,
            book: TipBook::new(),
            poller: LogPoller::new(max_pages),
            next_id: chrono::Utc::now().timestamp_millis().unsigned_abs(),
        };
        let driver = tokio::spawn(driver.run());

        Self {
            state,
            commands,
            cancel,
            driver: Some(driver),
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> StreamState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    /// Reset counters and restart from the push attempt (or polling, per mode).
    pub fn reconnect(&self) {
        if self.commands.send(Command::Reconnect).is_err() {
            tracing::debug!("reconnect ignored: stream already stopped");
        }
    }

    /// Stop the stream, close any open connection and wait for the driver.
    pub async fn dispose(mut self) {
        self.cancel.cancel();
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                tracing::warn!(error = %e, "tip stream driver panicked");
            }
        }
    }
}

impl Drop for TipStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for TipStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TipStream")
            .field("status", &state.status)
            .field("tips", &state.tips.len())
            .finish()
    }
}

/// Everything the driver needs, assembled by the builder.
pub(crate) struct DriverParts {
    pub config: StreamConfig,
    pub filter: Option<LogFilter>,
    pub decoder: Arc<dyn LogDecoder>,
    pub push: Option<Arc<dyn PushConnector>>,
    pub rpc: Option<Arc<dyn RpcTransport>>,
    pub backoff: ReconnectBackoff,
    pub mode: TransportMode,
    pub modes: Option<watch::Receiver<TransportMode>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Reconnect,
    ModeChanged(TransportMode),
    Disposed,
}

enum Plan {
    /// Nothing to do until reconnect, a mode change or disposal.
    Wait,
    Push,
    Poll,
}

enum Exit {
    Interrupted(Interrupt),
    Fallback,
    Halted,
}

enum SessionEnd {
    Interrupted(Interrupt),
    Failed(String),
}

/// Wait for the next external event. Disposal wins over everything else.
async fn next_interrupt(
    cancel: &CancellationToken,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    modes: &mut Option<watch::Receiver<TransportMode>>,
) -> Interrupt {
    let mode_changed = async {
        if let Some(rx) = modes {
            if rx.changed().await.is_ok() {
                return *rx.borrow_and_update();
            }
        }
        // no controls, or the controls were dropped: the mode is fixed
        std::future::pending().await
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Interrupt::Disposed,
        cmd = commands.recv() => match cmd {
            Some(Command::Reconnect) => Interrupt::Reconnect,
            None => Interrupt::Disposed,
        },
        mode = mode_changed => Interrupt::ModeChanged(mode),
    }
}

struct Driver {
    config: StreamConfig,
    filter: Option<LogFilter>,
    decoder: Arc<dyn LogDecoder>,
    push: Option<Arc<dyn PushConnector>>,
    rpc: Option<Arc<dyn RpcTransport>>,
    backoff: ReconnectBackoff,
    mode: TransportMode,
    modes: Option<watch::Receiver<TransportMode>>,
    commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
    state: watch::Sender<StreamState>,
    book: TipBook,
    poller: LogPoller,
    next_id: u64,
}

impl Driver {
    async fn run(mut self) {
        tracing::info!(
            contract = self.filter.as_ref().map(|f| f.address.as_str()),
            mode = %self.mode,
            "tip stream starting"
        );

        let mut plan = self.connect_plan();
        loop {
            let exit = match plan {
                Plan::Wait => Exit::Interrupted(self.interrupted().await),
                Plan::Push => self.run_push().await,
                Plan::Poll => self.run_poll().await,
            };
            plan = match exit {
                Exit::Interrupted(Interrupt::Disposed) => break,
                Exit::Interrupted(Interrupt::Reconnect) => {
                    tracing::info!("reconnect requested");
                    self.connect_plan()
                }
                Exit::Interrupted(Interrupt::ModeChanged(mode)) => {
                    self.apply_mode(mode);
                    self.connect_plan()
                }
                Exit::Fallback => Plan::Poll,
                Exit::Halted => Plan::Wait,
            };
        }
        tracing::debug!("tip stream stopped");
    }

    async fn interrupted(&mut self) -> Interrupt {
        next_interrupt(&self.cancel, &mut self.commands, &mut self.modes).await
    }

    fn settings(&self) -> TransportSettings {
        self.config.settings(self.mode)
    }

    fn apply_mode(&mut self, mode: TransportMode) {
        tracing::info!(from = %self.mode, to = %mode, "transport mode changed");
        self.mode = mode;
        self.poller.set_max_pages(self.settings().max_pages_per_tick);
    }

    fn next_request_id(&mut self) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    /// Publish a state change unless the stream has been disposed.
    fn publish(&self, update: impl FnOnce(&mut StreamState)) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.state.send_modify(update);
    }

    fn set_status(&self, status: StreamStatus, error: Option<String>) {
        self.publish(|s| {
            s.status = status;
            s.error = error;
        });
    }

    fn connect_plan(&self) -> Plan {
        if self.filter.is_none() {
            self.set_status(StreamStatus::Idle, Some(NO_CONTRACT_MESSAGE.into()));
            return Plan::Wait;
        }
        let push_ready = self.settings().max_ws_retries > 0
            && self.config.push_url.is_some()
            && self.push.is_some();
        if push_ready {
            Plan::Push
        } else {
            Plan::Poll
        }
    }

    // ─── Push path ─────────────────────────────────────────────────────────

    async fn run_push(&mut self) -> Exit {
        let (Some(connector), Some(url), Some(filter)) =
            (self.push.clone(), self.config.push_url.clone(), self.filter.clone())
        else {
            return Exit::Fallback;
        };
        let max_attempts = self.settings().max_ws_retries;
        let mut attempts = 0u32;

        loop {
            self.set_status(StreamStatus::Connecting, None);

            let connected = tokio::select! {
                biased;
                interrupt = next_interrupt(&self.cancel, &mut self.commands, &mut self.modes) => {
                    return Exit::Interrupted(interrupt);
                }
                res = connector.connect(&url) => res,
            };

            let reason = match connected {
                Err(e) => format!("Realtime connection error: {e}"),
                Ok(mut session) => {
                    attempts = 0;
                    tracing::info!(url = %url, "push transport connected");
                    self.set_status(StreamStatus::Connected, None);

                    let end = self.stream_session(session.as_mut(), &filter).await;
                    session.close().await;
                    match end {
                        SessionEnd::Interrupted(interrupt) => return Exit::Interrupted(interrupt),
                        SessionEnd::Failed(reason) => reason,
                    }
                }
            };

            attempts += 1;
            tracing::warn!(
                attempt = attempts,
                max_attempts,
                url = %url,
                reason = %reason,
                "push transport failed"
            );
            self.set_status(StreamStatus::Connecting, Some(reason));

            if attempts >= max_attempts {
                tracing::info!(attempts, "push attempts exhausted, falling back to polling");
                return Exit::Fallback;
            }

            let delay = self.backoff.delay(attempts);
            tracing::debug!(delay_ms = delay.as_millis() as u64, "reconnecting after backoff");
            tokio::select! {
                biased;
                interrupt = next_interrupt(&self.cancel, &mut self.commands, &mut self.modes) => {
                    return Exit::Interrupted(interrupt);
                }
                _ = time::sleep(delay) => {}
            }
        }
    }

    async fn stream_session(
        &mut self,
        session: &mut dyn PushSession,
        filter: &LogFilter,
    ) -> SessionEnd {
        let subscription_id = self.next_request_id();
        let request = push::subscribe_request(subscription_id, filter);
        let sent = match serde_json::to_string(&request) {
            Ok(text) => session.send_text(text).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = sent {
            return SessionEnd::Failed(format!("Realtime connection error: {e}"));
        }

        loop {
            let frame = tokio::select! {
                biased;
                interrupt = next_interrupt(&self.cancel, &mut self.commands, &mut self.modes) => {
                    return SessionEnd::Interrupted(interrupt);
                }
                frame = session.next_text() => frame,
            };

            let text = match frame {
                None => return SessionEnd::Failed(PUSH_CLOSED_MESSAGE.into()),
                Some(Err(e)) => return SessionEnd::Failed(format!("Realtime connection error: {e}")),
                Some(Ok(text)) => text,
            };

            match push::classify(&text, subscription_id) {
                Ok(PushFrame::Log(log)) => {
                    self.poller.observe_block(log.block_number_u64());
                    self.ingest(vec![log]);
                }
                Ok(PushFrame::Subscribed(id)) => {
                    tracing::debug!(subscription = %id, "log subscription active");
                }
                Ok(PushFrame::SubscriptionFailed(err)) => {
                    return SessionEnd::Failed(format!("Subscription rejected: {}", err.message));
                }
                Ok(PushFrame::Ignored) => {}
                Err(e) => tracing::warn!(error = %e, "failed to parse push frame"),
            }
        }
    }

    // ─── Pull path ─────────────────────────────────────────────────────────

    async fn run_poll(&mut self) -> Exit {
        let Some(rpc) = self.rpc.clone() else {
            tracing::error!("push unavailable and no HTTP RPC configured");
            self.set_status(StreamStatus::Error, Some(NO_RPC_MESSAGE.into()));
            return Exit::Halted;
        };
        let Some(filter) = self.filter.clone() else {
            return Exit::Halted;
        };

        let interval = self.settings().poll_interval;
        tracing::info!(
            url = %rpc.url(),
            interval_ms = interval.as_millis() as u64,
            mode = %self.mode,
            "polling for tips"
        );
        self.set_status(StreamStatus::Polling, None);

        let mut failures = 0u32;
        loop {
            let mut logs = Vec::new();
            // An in-flight tick only yields to disposal.
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Exit::Interrupted(Interrupt::Disposed),
                res = self.poller.tick(rpc.as_ref(), &filter, &mut logs) => res,
            };
            self.ingest(logs);

            let delay = match outcome {
                Ok(()) => {
                    if self.state.borrow().error.is_some() {
                        self.publish(|s| s.error = None);
                    }
                    failures = 0;
                    interval
                }
                Err(e) => match e.rate_limit_hint() {
                    Some(hint) => {
                        let delay = hint.delay().max(interval);
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "rate limited, delaying next poll"
                        );
                        delay
                    }
                    None => {
                        failures += 1;
                        let message = e.to_string();
                        tracing::warn!(failures, error = %e, url = %rpc.url(), "poll failed");
                        if failures >= MAX_POLL_FAILURES {
                            tracing::error!(failures, "polling halted after repeated failures");
                            self.set_status(StreamStatus::Error, Some(message));
                            return Exit::Halted;
                        }
                        self.publish(|s| s.error = Some(message));
                        interval
                    }
                },
            };

            tokio::select! {
                biased;
                interrupt = next_interrupt(&self.cancel, &mut self.commands, &mut self.modes) => {
                    return Exit::Interrupted(interrupt);
                }
                _ = time::sleep(delay) => {}
            }
        }
    }

    // ─── Ingest ────────────────────────────────────────────────────────────

    fn ingest(&mut self, logs: Vec<RawLog>) {
        let mut entries = Vec::with_capacity(logs.len());
        for log in logs {
            if log.is_removed() {
                tracing::debug!(tx = %log.tx_hash(), "skipping removed log");
                continue;
            }
            match self.decoder.decode(&log) {
                Ok(Some(tip)) => entries.push(tip),
                Ok(None) => {}
                Err(e) => tracing::warn!(tx = %log.tx_hash(), error = %e, "failed to decode log"),
            }
        }
        if entries.is_empty() {
            return;
        }

        let added = self.book.insert_batch(entries);
        if added > 0 {
            tracing::debug!(added, total = self.book.tips().len(), "tips added");
            let tips = self.book.tips().to_vec();
            self.publish(|s| s.tips = tips);
        }
    }
}
