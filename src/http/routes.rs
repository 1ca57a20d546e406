use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Conversation
        .route("/conversation", get(handlers::get_conversation))
        .route("/conversation/messages", post(handlers::submit_message))
        .route("/conversation/slots/:index", post(handlers::book_slot))
        .route("/conversation/reset", post(handlers::reset_conversation))
        // Channel control
        .route("/session/connect", post(handlers::connect_session))
        .route("/session/disconnect", post(handlers::disconnect_session))
        // Voice input
        .route("/speech/listen", post(handlers::start_listening))
        .route("/speech/stop", post(handlers::stop_listening))
        // Browser front-ends run on another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
