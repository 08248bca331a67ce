//! Client for the armlink controller: one WebSocket for request/response
//! control traffic, one for the raw camera stream.
//!
//! # Crate Structure
//!
//! - [`wire`] — envelope types, JSON codec, request-id generation
//! - [`client`] — connection state machines, request correlation, channels

/// Re-export wire types.
pub mod wire {
    pub use armlink_wire::*;
}

/// Re-export client types.
pub mod client {
    pub use armlink_client::*;
}
