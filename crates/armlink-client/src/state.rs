use tokio::sync::{broadcast, watch};

/// Buffered transitions retained for slow `state_changes` subscribers.
const EVENT_CAPACITY: usize = 32;

/// Lifecycle of one socket connection.
///
/// Transitions are driven only by socket lifecycle events, never set
/// directly by callers:
///
/// ```text
/// Disconnected ──connect──▶ Connecting ──open──▶ Connected
///      ▲                        │                    │
///      │                        │ error              │ close
///      │                        ▼                    ▼
///      └────connect───── Failed ◀──error──── Disconnected
/// ```
///
/// There is no automatic transition out of `Failed`; a caller must invoke
/// `connect` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Owns the observable state and last-error signals for one socket.
///
/// Current value plus replay-to-new-subscribers comes from `watch`; the
/// lossless transition sequence comes from a `broadcast` of every change.
/// On failure the error text is published before the `Failed` state, so a
/// subscriber that observes `Failed` already sees the error.
pub(crate) struct StateSignal {
    name: &'static str,
    state_tx: watch::Sender<ConnectionState>,
    error_tx: watch::Sender<Option<String>>,
    events_tx: broadcast::Sender<ConnectionState>,
}

impl StateSignal {
    pub(crate) fn new(name: &'static str) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (error_tx, _) = watch::channel(None);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            name,
            state_tx,
            error_tx,
            events_tx,
        }
    }

    pub(crate) fn current(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn subscribe_errors(&self) -> watch::Receiver<Option<String>> {
        self.error_tx.subscribe()
    }

    pub(crate) fn subscribe_changes(&self) -> broadcast::Receiver<ConnectionState> {
        self.events_tx.subscribe()
    }

    /// Publish one transition.
    pub(crate) fn publish(&self, state: ConnectionState) {
        tracing::debug!(channel = self.name, %state, "connection state changed");
        self.state_tx.send_replace(state);
        let _ = self.events_tx.send(state);
    }

    /// Publish the error text, then transition to `Failed`.
    pub(crate) fn fail(&self, message: String) {
        tracing::warn!(channel = self.name, error = %message, "connection failed");
        self.error_tx.send_replace(Some(message));
        self.publish(ConnectionState::Failed);
    }
}
