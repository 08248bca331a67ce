//! Stream channel: raw binary frames, no correlation.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::Message;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::socket::{InboundHandler, SocketCore};
use crate::state::ConnectionState;

/// Independent socket carrying unframed binary payloads (camera frames).
///
/// Each inbound binary message is forwarded verbatim as one [`Bytes`] unit;
/// frame boundaries are exactly the socket's message boundaries. There is
/// no envelope, no request/response pairing, and no interaction with the
/// control channel's correlation table.
pub struct StreamChannel {
    core: Arc<SocketCore>,
    frames: broadcast::Sender<Bytes>,
    handler: Arc<StreamHandler>,
}

impl StreamChannel {
    pub fn new(config: ClientConfig) -> Self {
        let (frames, _) = broadcast::channel(config.frame_capacity);
        let handler = Arc::new(StreamHandler {
            frames: frames.clone(),
        });
        Self {
            core: Arc::new(SocketCore::new("stream")),
            frames,
            handler,
        }
    }

    /// Open the stream socket. Fails fast when already connecting or
    /// connected.
    pub async fn connect(&self, url: &str) -> Result<()> {
        Arc::clone(&self.core)
            .connect(url, Arc::clone(&self.handler) as Arc<dyn InboundHandler>)
            .await
    }

    /// Close the stream socket; idempotent when no socket is open.
    pub async fn disconnect(&self) {
        self.core.disconnect().await;
    }

    /// Current connection state (replay-last-value).
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.core.signal().subscribe()
    }

    /// Every state transition in order.
    pub fn state_changes(&self) -> broadcast::Receiver<ConnectionState> {
        self.core.signal().subscribe_changes()
    }

    /// Last transport error text, or `None` if the socket never failed.
    pub fn last_error(&self) -> watch::Receiver<Option<String>> {
        self.core.signal().subscribe_errors()
    }

    /// Subscribe to inbound binary frames.
    pub fn subscribe_frames(&self) -> broadcast::Receiver<Bytes> {
        self.frames.subscribe()
    }

    /// Current state snapshot, without subscribing.
    pub fn current_state(&self) -> ConnectionState {
        self.core.state()
    }
}

impl Default for StreamChannel {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

struct StreamHandler {
    frames: broadcast::Sender<Bytes>,
}

impl InboundHandler for StreamHandler {
    fn on_message(&self, msg: Message) {
        // Only binary frames carry image data; anything else is noise.
        let Message::Binary(data) = msg else { return };
        let _ = self.frames.send(data);
    }

    fn on_disconnected(&self) {}
}
