//! Events feeding the coordinator's single ordered queue
//!
//! Every source posts into one `mpsc` queue: the session channel's reader,
//! speech capture episodes, speech playback tasks and user commands. The
//! coordinator consumes it in arrival order.

use tokio::sync::oneshot;

use crate::channel::{ConnectionState, InboundMessage};
use crate::error::{CaptureError, Result};

/// Why the session channel closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `disconnect()` was called
    Requested,
    /// The transport went away on its own
    Unexpected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    StateChanged(ConnectionState),
    Inbound(InboundMessage),
    /// An inbound frame could not be parsed; later frames are unaffected
    ProtocolError(String),
    Closed(CloseReason),
}

/// Terminal signal of one listening episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Transcript { episode: u64, text: String },
    Failed { episode: u64, error: CaptureError },
    /// Stopped by the user or by the listening timeout
    Cancelled { episode: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started { utterance: u64 },
    Ended { utterance: u64, interrupted: bool },
    Failed { utterance: u64, error: String },
}

/// User intent forwarded by a presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Connect,
    Disconnect,
    Submit(String),
    /// Book the proposed slot at this position
    SelectSlot(usize),
    Reset,
    StartListening,
    StopListening,
    Shutdown,
}

/// An intent plus an optional reply slot for its outcome
#[derive(Debug)]
pub struct Command {
    pub intent: Intent,
    pub reply: Option<oneshot::Sender<Result<()>>>,
}

#[derive(Debug)]
pub enum SessionEvent {
    /// `link` is the number of the connection that produced the event
    Channel { link: u64, event: ChannelEvent },
    Capture(CaptureEvent),
    Playback(PlaybackEvent),
    Command(Command),
}
