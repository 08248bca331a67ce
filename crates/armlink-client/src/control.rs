//! Control channel: request dispatch and inbound demultiplexing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use armlink_wire::{
    decode_response, encode_request, Method, RequestEnvelope, RequestIdGenerator,
};
use serde_json::Value;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;

use crate::config::ClientConfig;
use crate::correlation::CorrelationTable;
use crate::error::{ClientError, Result};
use crate::socket::{InboundHandler, SocketCore};
use crate::state::ConnectionState;

/// Counters for inbound traffic that was dropped without settling anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DropStats {
    /// Messages that were not valid envelopes (bad JSON, no request id).
    pub malformed: u64,
    /// Valid envelopes whose id matched no outstanding request (unknown,
    /// duplicate, or already settled).
    pub uncorrelated: u64,
}

#[derive(Default)]
struct DropCounters {
    malformed: AtomicU64,
    uncorrelated: AtomicU64,
}

/// Request/response RPC over one WebSocket.
///
/// Arbitrarily many logical requests may be in flight at once; each is
/// tagged with a correlation id and the matching inbound message settles
/// exactly the caller that issued it, exactly once.
pub struct ControlChannel {
    core: Arc<SocketCore>,
    table: Arc<CorrelationTable>,
    ids: RequestIdGenerator,
    raw_tap: broadcast::Sender<String>,
    counters: Arc<DropCounters>,
    config: ClientConfig,
    handler: Arc<ControlHandler>,
    sweeper: StdMutex<Option<JoinHandle<()>>>,
}

impl ControlChannel {
    pub fn new(config: ClientConfig) -> Self {
        let table = Arc::new(CorrelationTable::new());
        let (raw_tap, _) = broadcast::channel(config.raw_tap_capacity);
        let counters = Arc::new(DropCounters::default());
        let handler = Arc::new(ControlHandler {
            table: Arc::clone(&table),
            raw_tap: raw_tap.clone(),
            counters: Arc::clone(&counters),
        });
        Self {
            core: Arc::new(SocketCore::new("control")),
            table,
            ids: RequestIdGenerator::new(),
            raw_tap,
            counters,
            config,
            handler,
            sweeper: StdMutex::new(None),
        }
    }

    /// Open the control socket.
    ///
    /// Fails fast with [`ClientError::AlreadyConnected`] when a connect is
    /// already in progress or established.
    pub async fn connect(&self, url: &str) -> Result<()> {
        Arc::clone(&self.core)
            .connect(url, Arc::clone(&self.handler) as Arc<dyn InboundHandler>)
            .await?;
        self.spawn_sweeper();
        Ok(())
    }

    /// Close the control socket and reject every outstanding request.
    /// Idempotent when no socket is open.
    pub async fn disconnect(&self) {
        self.core.disconnect().await;
        let rejected = self.table.fail_all();
        if rejected > 0 {
            tracing::debug!(rejected, "rejected pending requests on disconnect");
        }
    }

    /// Dispatch one request and await its response.
    ///
    /// Registers a continuation under a fresh id, writes the envelope as a
    /// single text frame, and settles exactly once: `Ok` with the response
    /// payload, or `Err` with the remote error, a timeout, or a
    /// disconnect. Callable in any state; when not connected it returns
    /// [`ClientError::NotConnected`] instead of silently dropping the
    /// payload.
    pub async fn send_request(
        &self,
        endpoint: &str,
        method: Method,
        payload: Value,
    ) -> Result<Value> {
        if self.core.state() != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }

        let id = self.ids.next_id();
        let (tx, rx) = oneshot::channel();
        let deadline = Instant::now() + self.config.request_timeout;
        self.table.insert(&id, tx, deadline)?;

        let envelope = RequestEnvelope::new(endpoint, method, payload, id.clone());
        let text = match encode_request(&envelope) {
            Ok(text) => text,
            Err(err) => {
                self.table.abandon(&id);
                return Err(err.into());
            }
        };
        tracing::debug!(request_id = %id, %endpoint, %method, "dispatching request");
        if let Err(err) = self.core.send_text(text).await {
            self.table.abandon(&id);
            return Err(err);
        }

        match tokio::time::timeout(self.config.request_timeout, rx).await {
            Err(_) => {
                self.table.abandon(&id);
                Err(ClientError::Timeout(self.config.request_timeout))
            }
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Ok(Ok(response)) => match response.error {
                Some(body) => Err(ClientError::Remote(body.message)),
                None => Ok(response.payload.unwrap_or_else(|| Value::Object(Default::default()))),
            },
        }
    }

    /// Current connection state (replay-last-value).
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.core.signal().subscribe()
    }

    /// Every state transition in order, for observers that need the full
    /// sequence rather than just the latest value.
    pub fn state_changes(&self) -> broadcast::Receiver<ConnectionState> {
        self.core.signal().subscribe_changes()
    }

    /// Last transport error text, or `None` if the socket never failed.
    pub fn last_error(&self) -> watch::Receiver<Option<String>> {
        self.core.signal().subscribe_errors()
    }

    /// Raw notification tap: every inbound text frame, correlated or not,
    /// before any envelope decoding.
    pub fn subscribe_raw(&self) -> broadcast::Receiver<String> {
        self.raw_tap.subscribe()
    }

    /// Current state snapshot, without subscribing.
    pub fn current_state(&self) -> ConnectionState {
        self.core.state()
    }

    /// Number of requests currently awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.table.len()
    }

    /// Counters for inbound messages dropped by the demultiplexer.
    pub fn stats(&self) -> DropStats {
        DropStats {
            malformed: self.counters.malformed.load(Ordering::Relaxed),
            uncorrelated: self.counters.uncorrelated.load(Ordering::Relaxed),
        }
    }

    /// Start the expiry sweeper on first connect. It runs for the lifetime
    /// of the channel; sweeping an empty table is free.
    fn spawn_sweeper(&self) {
        let mut slot = self.sweeper.lock().expect("sweeper slot poisoned");
        if slot.is_some() {
            return;
        }
        let table = Arc::clone(&self.table);
        let interval = self.config.sweep_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let expired = table.sweep(Instant::now());
                if expired > 0 {
                    tracing::debug!(expired, "swept expired pending requests");
                }
            }
        }));
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        if let Some(task) = self.sweeper.lock().expect("sweeper slot poisoned").take() {
            task.abort();
        }
    }
}

/// Demultiplexer for inbound control traffic.
struct ControlHandler {
    table: Arc<CorrelationTable>,
    raw_tap: broadcast::Sender<String>,
    counters: Arc<DropCounters>,
}

impl InboundHandler for ControlHandler {
    fn on_message(&self, msg: Message) {
        // The control socket is text-only; binary, ping and pong frames
        // carry no envelope.
        let Message::Text(text) = msg else { return };
        let raw = text.as_str().to_owned();
        let _ = self.raw_tap.send(raw.clone());

        let response = match decode_response(&raw) {
            Ok(response) => response,
            Err(err) => {
                self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(error = %err, "dropping undecodable control message");
                return;
            }
        };

        match self.table.complete(&response.request_id) {
            Some(pending) => {
                // The caller may have stopped waiting; that is its business.
                let _ = pending.tx.send(response);
            }
            None => {
                self.counters.uncorrelated.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    request_id = %response.request_id,
                    "dropping response with no outstanding request"
                );
            }
        }
    }

    fn on_disconnected(&self) {
        let rejected = self.table.fail_all();
        if rejected > 0 {
            tracing::debug!(rejected, "rejected pending requests on connection loss");
        }
    }
}

impl Default for ControlChannel {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}
