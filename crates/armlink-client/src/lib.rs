//! High-level connection management for armlink WebSocket channels.
//!
//! This is the "just works" layer. Two independent channels connect to the
//! arm controller:
//!
//! - [`ControlChannel`] multiplexes request/response traffic over one
//!   socket by tagging every request with a correlation id and matching
//!   inbound messages back to the caller that issued them.
//! - [`StreamChannel`] carries raw binary frames (camera images) with no
//!   request/response semantics.
//!
//! Both expose their connection lifecycle as an explicit state machine
//! ([`ConnectionState`]) observable through replay-last-value signals, and
//! share one internal socket core so the state machine exists exactly once.

pub mod config;
pub mod control;
pub mod correlation;
pub mod endpoints;
pub mod error;
pub mod state;
pub mod stream;

mod socket;

pub use config::ClientConfig;
pub use control::{ControlChannel, DropStats};
pub use correlation::CorrelationTable;
pub use error::{ClientError, Result};
pub use state::ConnectionState;
pub use stream::StreamChannel;
