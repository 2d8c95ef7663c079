use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Voice session control
        .route("/assistant/listen", post(handlers::toggle_listening))
        .route("/assistant/stop", post(handlers::stop_listening))
        // Assistant queries
        .route("/assistant/status", get(handlers::get_status))
        .route("/assistant/chat", get(handlers::get_chat))
        // Text and announcements
        .route("/assistant/say", post(handlers::say))
        .route("/assistant/announce", post(handlers::announce))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
