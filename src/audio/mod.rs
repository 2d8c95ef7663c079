pub mod ambient;
pub mod capture;
pub mod codec;
pub mod playback;

pub use ambient::AmbientBed;
pub use capture::{CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureFrame, CaptureSource};
pub use codec::{AudioBuffer, CodecError, TransportFrame};
pub use playback::{NullSink, OutputClock, OutputScheduler, SpeakerSink, WallClock, WavTapSink};
