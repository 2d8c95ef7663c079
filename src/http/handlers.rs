use super::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SayRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AnnounceRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ListenResponse {
    pub listening: bool,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /assistant/listen
/// Toggle the voice session on or off
pub async fn toggle_listening(State(state): State<AppState>) -> impl IntoResponse {
    info!("Toggling listening state");

    match state.assistant.toggle_listening().await {
        Ok(listening) => {
            let status = if listening { "listening" } else { "off" };
            (
                StatusCode::OK,
                Json(ListenResponse {
                    listening,
                    status: status.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to toggle listening: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to toggle listening: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /assistant/stop
/// Stop the voice session (idempotent)
pub async fn stop_listening(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stopping voice session");

    match state.assistant.stop().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ListenResponse {
                listening: false,
                status: "off".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to stop: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /assistant/status
/// Current assistant statistics
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.assistant.status().await;
    (StatusCode::OK, Json(status)).into_response()
}

/// GET /assistant/chat
/// The accumulated chat log
pub async fn get_chat(State(state): State<AppState>) -> impl IntoResponse {
    let entries = state.assistant.chat().await;
    (StatusCode::OK, Json(entries)).into_response()
}

/// POST /assistant/say
/// Append a typed user message to the chat log
pub async fn say(
    State(state): State<AppState>,
    Json(req): Json<SayRequest>,
) -> impl IntoResponse {
    state.assistant.send_text(&req.text).await;
    let entries = state.assistant.chat().await;
    (StatusCode::OK, Json(entries)).into_response()
}

/// POST /assistant/announce
/// One-shot TTS announcement played through the scheduler
pub async fn announce(
    State(state): State<AppState>,
    Json(req): Json<AnnounceRequest>,
) -> impl IntoResponse {
    match state.assistant.announce(&req.text).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "queued" })),
        )
            .into_response(),
        Err(e) => {
            error!("Announce failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Announce failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
