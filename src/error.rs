//! Error types for the scheduling session client.

use crate::channel::ConnectionState;

/// Failures of the speech capture adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// No speech-to-text engine on this platform.
    #[error("speech capture is not available")]
    Unavailable,

    /// A listening episode is already running.
    #[error("already listening")]
    AlreadyListening,

    /// The engine reported an error code.
    #[error("engine error: {0}")]
    Engine(String),
}

/// Top-level error type for the session manager.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The channel could not be established or dropped unexpectedly.
    #[error("connection error: {0}")]
    Connection(String),

    /// A send was attempted while the channel was not connected.
    #[error("not connected: send discarded while channel is {0}")]
    DiscardedSend(ConnectionState),

    /// An utterance was submitted while the channel was not connected.
    #[error("not connected: utterance rejected")]
    NotConnected,

    /// The utterance was empty after trimming whitespace.
    #[error("utterance is empty")]
    EmptyUtterance,

    /// No proposed slot at the requested position.
    #[error("no proposed slot at index {0}")]
    SlotNotFound(usize),

    /// Speech-to-text error.
    #[error("speech capture error: {0}")]
    SpeechCapture(#[from] CaptureError),

    /// Text-to-speech error.
    #[error("speech playback error: {0}")]
    SpeechPlayback(String),

    /// Malformed or unrecognized inbound payload.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The coordinator event loop is no longer running.
    #[error("coordinator stopped")]
    Stopped,
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SchedulerError>;
