//! Wire envelopes for the armlink control protocol.
//!
//! The control socket carries one JSON document per text frame:
//! - Outbound: `{ endpoint, method, payload, request_id }`
//! - Inbound: `{ request_id, payload?, error? }`
//!
//! `request_id` ties an inbound message back to the request that produced
//! it. This crate owns the envelope types, the JSON codec, and request-id
//! generation; it knows nothing about sockets or pending-request state.

pub mod envelope;
pub mod error;
pub mod id;

pub use envelope::{
    decode_response, encode_request, ErrorBody, Method, RequestEnvelope, ResponseEnvelope,
};
pub use error::{Result, WireError};
pub use id::RequestIdGenerator;
