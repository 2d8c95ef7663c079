use serde::{Deserialize, Serialize};

use crate::audio::TransportFrame;

/// Response modality requested from the voice model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseModality {
    Audio,
}

/// Configuration bundle published when a live session opens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSetup {
    pub session_id: String,
    /// System persona text driving the assistant's voice and register
    pub persona: String,
    pub response_modality: ResponseModality,
    /// Prebuilt voice preset name
    pub voice: String,
}

/// Outbound media frame published on the session's input subject
#[derive(Debug, Serialize, Deserialize)]
pub struct MediaFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub media: TransportFrame,
    pub timestamp: String, // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Server event received on the session's event subject
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The user started talking over the assistant; cut in-flight speech
    Interrupted,
    /// One chunk of assistant speech audio
    InlineAudio { media: TransportFrame },
    /// Streamed fragment of the assistant's spoken text
    OutputTranscript { text: String },
    /// Streamed fragment of the recognized user speech
    InputTranscript { text: String },
    /// End of one conversational turn
    TurnComplete,
}

/// One-shot TTS announcement request (request/reply)
#[derive(Debug, Serialize, Deserialize)]
pub struct AnnounceRequest {
    pub text: String,
    pub voice: String,
}

/// TTS announcement reply carrying a single base64 PCM16 payload
#[derive(Debug, Serialize, Deserialize)]
pub struct AnnounceReply {
    pub audio: String,
    pub sample_rate: u32,
}
