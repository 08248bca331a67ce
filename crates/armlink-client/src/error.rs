use std::time::Duration;

/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// WebSocket-level error (handshake, transport, protocol).
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    /// Wire envelope encoding/decoding error.
    #[error("wire error: {0}")]
    Wire(#[from] armlink_wire::WireError),

    /// `connect` was called while already connecting or connected.
    #[error("already connecting or connected")]
    AlreadyConnected,

    /// The operation requires a connected socket.
    #[error("not connected")]
    NotConnected,

    /// Two outstanding requests were assigned the same id.
    #[error("duplicate request id: {0}")]
    DuplicateRequestId(String),

    /// The response carried an `error` field.
    #[error("remote error: {0}")]
    Remote(String),

    /// No response arrived within the configured deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The socket closed or failed before a response arrived.
    #[error("connection closed before reply")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, ClientError>;
