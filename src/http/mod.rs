//! HTTP API server for external control
//!
//! This module provides a REST API replacing the original UI controls:
//! - POST /assistant/listen - Toggle the voice session
//! - POST /assistant/stop - Stop the voice session
//! - GET /assistant/status - Query assistant statistics
//! - GET /assistant/chat - Get the chat log
//! - POST /assistant/say - Append a typed user message
//! - POST /assistant/announce - Play a one-shot TTS announcement
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
