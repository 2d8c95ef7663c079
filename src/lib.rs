pub mod assistant;
pub mod audio;
pub mod config;
pub mod http;
pub mod live;

pub use assistant::{AssistantSession, AssistantStatus, ChatEntry, ChatLog, Speaker};
pub use audio::{
    AmbientBed, AudioBuffer, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureFrame,
    CaptureSource, CodecError, OutputClock, OutputScheduler, SpeakerSink, TransportFrame, WallClock,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use live::{LiveSession, ServerEvent, SessionSetup, SessionSignal, SessionState};
