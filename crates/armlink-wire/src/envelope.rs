use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WireError};

/// Request method, mirroring the controller's routing conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            other => Err(format!("unsupported method: {other}")),
        }
    }
}

/// Outbound control message: one request, tagged for correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub endpoint: String,
    pub method: Method,
    pub payload: Value,
    pub request_id: String,
}

impl RequestEnvelope {
    /// Build an envelope for a single request.
    pub fn new(
        endpoint: impl Into<String>,
        method: Method,
        payload: Value,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            payload,
            request_id: request_id.into(),
        }
    }
}

/// Error body carried by a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Inbound control message.
///
/// `request_id` is mandatory; presence of `error` is authoritative for
/// failure, otherwise the call succeeded and `payload` (if any) is the
/// result. Unknown fields are ignored so the controller can grow its
/// responses without breaking older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ResponseEnvelope {
    /// True when the response signals failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Serialize a request envelope to its wire form (one JSON text frame).
pub fn encode_request(envelope: &RequestEnvelope) -> Result<String> {
    Ok(serde_json::to_string(envelope)?)
}

/// Parse an inbound text frame into a response envelope.
///
/// Fails when the text is not valid JSON, does not match the envelope
/// shape, or carries an empty `request_id`. Callers decide what to do with
/// undecodable traffic; this layer only classifies it.
pub fn decode_response(text: &str) -> Result<ResponseEnvelope> {
    let envelope: ResponseEnvelope = serde_json::from_str(text)?;
    if envelope.request_id.is_empty() {
        return Err(WireError::MissingRequestId);
    }
    Ok(envelope)
}
