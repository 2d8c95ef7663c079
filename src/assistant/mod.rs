//! Voice assistant orchestration
//!
//! This module provides the `AssistantSession` abstraction that manages:
//! - Microphone capture and outbound frame packaging
//! - The live session to the remote voice model
//! - Playback scheduling and interruption
//! - Streaming-transcript aggregation into the chat log
//! - Ambient ducking and session statistics

mod controller;
mod transcript;

pub use controller::{AssistantSession, AssistantStatus};
pub use transcript::{ChatEntry, ChatLog, Speaker, TranscriptAccumulator};
