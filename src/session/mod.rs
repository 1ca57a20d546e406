//! Conversation coordination
//!
//! This module provides the `Coordinator` that manages:
//! - The ordered conversation log and proposed time slots
//! - Submits from typed input, voice input and slot bookings
//! - Agent replies arriving over the session channel
//! - Speech playback and capture episodes
//! - Snapshot publication for presentation layers

mod config;
mod coordinator;
mod handle;
mod state;

pub use config::{SessionConfig, SpeakPolicy};
pub use coordinator::{booking_utterance, Coordinator};
pub use handle::CoordinatorHandle;
pub use state::{ConversationSnapshot, ConversationState, Message, Phase, Role};
