//! Live bidirectional session with the remote voice model
//!
//! This module wraps the streaming transport:
//! - Session setup (persona, response modality, voice preset)
//! - Outbound media frames (fire-and-forget)
//! - Inbound server events in strict arrival order
//! - Open/close/error lifecycle with no reconnection

pub mod messages;
pub mod session;

pub use messages::{
    AnnounceReply, AnnounceRequest, MediaFrameMessage, ResponseModality, ServerEvent, SessionSetup,
};
pub use session::{LiveSession, SessionSignal, SessionState};
