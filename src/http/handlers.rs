use super::state::AppState;
use crate::error::{CaptureError, SchedulerError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct SubmitRequest {
    /// Utterance text
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /conversation
/// Current conversation snapshot
pub async fn get_conversation(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.coordinator.snapshot()))
}

/// POST /conversation/messages
/// Submit a typed utterance
pub async fn submit_message(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Response {
    let result = state.coordinator.submit(req.content).await;
    respond(&state, result)
}

/// POST /conversation/slots/:index
/// Book one of the proposed slots
pub async fn book_slot(State(state): State<AppState>, Path(index): Path<usize>) -> Response {
    info!("Booking slot {} via HTTP", index);
    let result = state.coordinator.select_slot(index).await;
    respond(&state, result)
}

/// POST /conversation/reset
/// Clear the conversation locally and on the agent
pub async fn reset_conversation(State(state): State<AppState>) -> Response {
    let result = state.coordinator.reset().await;
    respond(&state, result)
}

/// POST /session/connect
pub async fn connect_session(State(state): State<AppState>) -> Response {
    let result = state.coordinator.connect().await;
    respond(&state, result)
}

/// POST /session/disconnect
pub async fn disconnect_session(State(state): State<AppState>) -> Response {
    let result = state.coordinator.disconnect().await;
    respond(&state, result)
}

/// POST /speech/listen
pub async fn start_listening(State(state): State<AppState>) -> Response {
    let result = state.coordinator.start_listening().await;
    respond(&state, result)
}

/// POST /speech/stop
pub async fn stop_listening(State(state): State<AppState>) -> Response {
    let result = state.coordinator.stop_listening().await;
    respond(&state, result)
}

/// Snapshot on success, mapped status code on failure
fn respond(state: &AppState, result: crate::error::Result<()>) -> Response {
    match result {
        Ok(()) => (StatusCode::OK, Json(state.coordinator.snapshot())).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("Request failed: {}", e);
            }
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn status_for(err: &SchedulerError) -> StatusCode {
    match err {
        SchedulerError::EmptyUtterance => StatusCode::BAD_REQUEST,
        SchedulerError::SlotNotFound(_) => StatusCode::NOT_FOUND,
        SchedulerError::NotConnected
        | SchedulerError::DiscardedSend(_)
        | SchedulerError::SpeechCapture(CaptureError::AlreadyListening) => StatusCode::CONFLICT,
        SchedulerError::Connection(_) => StatusCode::BAD_GATEWAY,
        SchedulerError::SpeechCapture(CaptureError::Unavailable) | SchedulerError::Stopped => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
