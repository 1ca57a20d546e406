//! Session channel to the scheduling agent
//!
//! This module owns the duplex connection to the backend agent:
//! - Wire protocol types (JSON frames, time slots)
//! - The `Transport` abstraction and its WebSocket implementation
//! - `SessionChannel`, which tracks `ConnectionState` and forwards inbound
//!   frames to the coordinator queue in arrival order

mod client;
mod identity;
pub mod messages;
mod transport;
mod websocket;

pub use client::{ConnectionState, SessionChannel};
pub use identity::SessionIdentity;
pub use messages::{InboundMessage, OutboundMessage, TimeSlot};
pub use transport::{Transport, TransportFrame, TransportLink};
pub use websocket::WebSocketTransport;
