//! HTTP control API for external presentation layers
//!
//! This module exposes the coordinator over REST:
//! - GET /health - Health check
//! - GET /conversation - Current snapshot
//! - POST /conversation/messages - Submit an utterance
//! - POST /conversation/slots/:index - Book a proposed slot
//! - POST /conversation/reset - Start over
//! - POST /session/connect, /session/disconnect - Channel control
//! - POST /speech/listen, /speech/stop - Voice input control

mod handlers;
mod routes;
mod state;

pub use handlers::SubmitRequest;
pub use routes::create_router;
pub use state::AppState;
