/// Errors that can occur while encoding or decoding wire envelopes.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The message is not valid JSON, or does not match the envelope shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The inbound message parsed but carries an empty `request_id`.
    #[error("missing request id")]
    MissingRequestId,
}

pub type Result<T> = std::result::Result<T, WireError>;
