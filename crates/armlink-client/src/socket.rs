//! Generic socket core shared by the control and stream channels.
//!
//! One state machine, one connect guard, one reader loop. Channels differ
//! only in how they decode inbound traffic, expressed through
//! [`InboundHandler`].

use std::sync::{Arc, Mutex as StdMutex};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{ClientError, Result};
use crate::state::{ConnectionState, StateSignal};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
pub(crate) type WsSource = SplitStream<WsStream>;

/// Per-channel decoding strategy for inbound traffic.
pub(crate) trait InboundHandler: Send + Sync + 'static {
    /// Called for every inbound message while the socket is open.
    fn on_message(&self, msg: Message);

    /// Called once after the socket leaves `Connected`, whether by clean
    /// close, transport error, or explicit disconnect.
    fn on_disconnected(&self);
}

/// Owns one socket: its state signal, write half, and reader task.
pub(crate) struct SocketCore {
    name: &'static str,
    signal: StateSignal,
    sink: Mutex<Option<WsSink>>,
    reader: StdMutex<Option<JoinHandle<()>>>,
    // Serializes connect attempts so the Connecting/Connected guard and the
    // transition into Connecting are one atomic step.
    connect_gate: Mutex<()>,
}

impl SocketCore {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            signal: StateSignal::new(name),
            sink: Mutex::new(None),
            reader: StdMutex::new(None),
            connect_gate: Mutex::new(()),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.signal.current()
    }

    pub(crate) fn signal(&self) -> &StateSignal {
        &self.signal
    }

    /// Open the socket and start the reader loop.
    ///
    /// Fails fast without touching the socket when already connecting or
    /// connected. Publishes `Connecting` before the handshake, `Connected`
    /// once the socket is open, or the error text followed by `Failed`
    /// when the handshake fails.
    pub(crate) async fn connect(
        self: Arc<Self>,
        url: &str,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<()> {
        let _gate = self.connect_gate.lock().await;
        match self.signal.current() {
            ConnectionState::Connecting | ConnectionState::Connected => {
                return Err(ClientError::AlreadyConnected);
            }
            ConnectionState::Disconnected | ConnectionState::Failed => {}
        }

        self.signal.publish(ConnectionState::Connecting);
        let (ws, _response) = match connect_async(url).await {
            Ok(ok) => ok,
            Err(err) => {
                self.signal
                    .fail(format!("{} websocket error: {err}", self.name));
                return Err(err.into());
            }
        };

        let (sink, source) = ws.split();
        *self.sink.lock().await = Some(sink);
        self.signal.publish(ConnectionState::Connected);
        tracing::info!(channel = self.name, %url, "websocket connected");

        let core = Arc::clone(&self);
        let task = tokio::spawn(async move { core.read_loop(source, handler).await });
        *self.reader.lock().expect("reader slot poisoned") = Some(task);
        Ok(())
    }

    /// Deliver inbound messages until the socket closes or errors.
    async fn read_loop(self: Arc<Self>, mut source: WsSource, handler: Arc<dyn InboundHandler>) {
        loop {
            match source.next().await {
                Some(Ok(Message::Close(_))) | None => {
                    self.sink.lock().await.take();
                    self.signal.publish(ConnectionState::Disconnected);
                    handler.on_disconnected();
                    return;
                }
                Some(Ok(msg)) => handler.on_message(msg),
                Some(Err(err)) => {
                    self.sink.lock().await.take();
                    self.signal
                        .fail(format!("{} websocket error: {err}", self.name));
                    handler.on_disconnected();
                    return;
                }
            }
        }
    }

    /// Write one text frame. Errors when no socket is connected.
    pub(crate) async fn send_text(&self, text: String) -> Result<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(ClientError::NotConnected)?;
        sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Close the socket if one exists and transition to `Disconnected`.
    ///
    /// Idempotent: a no-op when no socket is open. The reader task is
    /// stopped first so the close is reported as exactly one transition.
    pub(crate) async fn disconnect(&self) {
        if let Some(task) = self.reader.lock().expect("reader slot poisoned").take() {
            task.abort();
        }
        let taken = self.sink.lock().await.take();
        let Some(mut sink) = taken else {
            return;
        };
        let _ = sink.close().await;
        self.signal.publish(ConnectionState::Disconnected);
        tracing::info!(channel = self.name, "websocket disconnected");
    }
}
