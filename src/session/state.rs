use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::{ConnectionState, SessionIdentity, TimeSlot};

/// Who said it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
}

/// One entry of the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    pub content: String,

    /// When the coordinator appended it
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            sent_at: Utc::now(),
        }
    }
}

/// Messages and proposed slots of one conversation
///
/// Only the coordinator mutates this. The log is append-only; slots are
/// replaced as a whole; a reset clears both together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Message>,
    proposed_slots: Vec<TimeSlot>,
}

impl ConversationState {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn proposed_slots(&self) -> &[TimeSlot] {
        &self.proposed_slots
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn replace_slots(&mut self, slots: Vec<TimeSlot>) {
        self.proposed_slots = slots;
    }

    pub(crate) fn clear_slots(&mut self) {
        self.proposed_slots.clear();
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Coordinator phase, meaningful only while connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotConnected,
    AwaitingReply,
    Idle,
}

/// Read-only view published to presentation after every processed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub identity: SessionIdentity,
    pub connection: ConnectionState,
    pub phase: Phase,
    pub messages: Vec<Message>,
    pub proposed_slots: Vec<TimeSlot>,
    pub listening: bool,
    pub speaking: bool,
    /// False when no speech-to-text engine exists (voice input disabled)
    pub capture_available: bool,
    /// Last reported failure, e.g. "not connected"
    pub last_error: Option<String>,
    /// Number of resets so far; a change means the log was cleared
    pub resets: u64,
}
