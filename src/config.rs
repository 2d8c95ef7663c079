use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub grid: GridConfig,
    pub audio: AudioConfig,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Connection to the grid (the message fabric carrying voice traffic)
#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    pub url: String,
    /// API credential placeholder; token auth when set
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Capture processing rate (the live model expects 16kHz)
    pub capture_sample_rate: u32,
    /// Samples per captured frame
    pub frame_samples: usize,
    /// Output context rate for assistant speech
    pub playback_sample_rate: u32,
    /// WAV file to capture from instead of a microphone
    pub fixture_path: Option<String>,
    /// Optional WAV file receiving the scheduled playback timeline
    pub playback_tap: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// System persona text sent in the session setup bundle
    pub persona: String,
    /// Prebuilt voice preset name
    pub voice: String,
    /// First chat entry shown before any conversation
    pub greeting: String,
    /// When true, mic/session failures propagate to the caller instead of
    /// silently reverting the listening state
    pub strict_errors: bool,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
