use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Candidate meeting window proposed by the agent
///
/// `start` and `end` are kept exactly as the backend sent them so they can be
/// echoed back when booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
    pub formatted_start: String,
    pub formatted_end: String,
    pub duration_minutes: u32,
}

/// Frame sent from the client to the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// One user turn, typed or spoken
    #[serde(rename = "message")]
    UserUtterance { content: String },

    /// Ask the agent to forget the conversation
    #[serde(rename = "reset")]
    ResetRequest,
}

impl OutboundMessage {
    pub fn utterance(content: impl Into<String>) -> Self {
        Self::UserUtterance {
            content: content.into(),
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserUtterance { .. } => "message",
            Self::ResetRequest => "reset",
        }
    }
}

/// Frame received from the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Agent reply, optionally carrying proposed slots
    Response {
        content: String,
        #[serde(default)]
        available_slots: Option<Vec<TimeSlot>>,
        #[serde(default)]
        conversation_state: Option<serde_json::Value>,
        #[serde(default)]
        timestamp: Option<String>,
    },

    /// Greeting sent once the agent accepts the channel
    Connected {
        #[serde(default)]
        message: String,
        #[serde(default)]
        timestamp: Option<String>,
    },

    /// The agent started working on the last utterance
    Processing {
        #[serde(default)]
        message: String,
        #[serde(default)]
        timestamp: Option<String>,
    },

    /// Acknowledges a reset request
    ResetComplete {
        #[serde(default)]
        message: String,
        #[serde(default)]
        timestamp: Option<String>,
    },

    /// Agent-side failure while handling a frame
    Error {
        #[serde(default)]
        message: String,
        #[serde(default)]
        timestamp: Option<String>,
    },
}

impl InboundMessage {
    /// Parse a text frame, rejecting malformed JSON and unknown frame types
    pub fn parse(text: &str) -> Result<Self, SchedulerError> {
        serde_json::from_str(text).map_err(|e| SchedulerError::Protocol(e.to_string()))
    }
}
