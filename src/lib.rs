pub mod auth;
pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod session;
pub mod speech;
pub mod terminal;
pub mod testing;

pub use auth::{AuthClient, AuthStatus};
pub use channel::{
    ConnectionState, InboundMessage, OutboundMessage, SessionChannel, SessionIdentity, TimeSlot,
    Transport, TransportFrame, TransportLink, WebSocketTransport,
};
pub use config::Config;
pub use error::{CaptureError, SchedulerError};
pub use events::{CaptureEvent, ChannelEvent, CloseReason, Intent, PlaybackEvent, SessionEvent};
pub use http::{create_router, AppState};
pub use session::{
    booking_utterance, ConversationSnapshot, ConversationState, Coordinator, CoordinatorHandle,
    Message, Phase, Role, SessionConfig, SpeakPolicy,
};
pub use speech::{
    SpeechCapture, SpeechFactory, SpeechPlayback, SpeechRecognizer, SpeechSynthesizer,
    VoiceSettings,
};
