use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the PCM/base64 codec layer
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("PCM byte length {byte_len} is not a multiple of {frame_bytes} (2 bytes x {channels} channels)")]
    Format {
        byte_len: usize,
        channels: u16,
        frame_bytes: usize,
    },

    #[error("channel count must be at least 1")]
    NoChannels,
}

/// A base64-wrapped PCM16 chunk as carried over the live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportFrame {
    /// Base64-encoded little-endian PCM16 bytes
    pub data: String,
    /// MIME tag carrying the encoding and sample rate, e.g. "audio/pcm;rate=16000"
    pub mime_type: String,
}

impl TransportFrame {
    /// An empty frame (used as a final marker on the outbound stream)
    pub fn empty(sample_rate: u32) -> Self {
        Self {
            data: String::new(),
            mime_type: format!("audio/pcm;rate={}", sample_rate),
        }
    }
}

/// A decoded playback buffer: one Vec<f32> per channel, samples in [-1.0, 1.0)
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Number of sample frames (per-channel sample count)
    pub fn frame_count(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Playback duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Encode raw bytes as standard base64
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode standard base64 into raw bytes
pub fn decode_base64(data: &str) -> Result<Vec<u8>, CodecError> {
    Ok(base64::engine::general_purpose::STANDARD.decode(data)?)
}

/// Interpret interleaved little-endian PCM16 bytes as a normalized audio buffer
///
/// Each i16 sample is divided by 32768.0, then samples are deinterleaved by
/// channel. Fails when the byte length does not divide into whole sample
/// frames.
pub fn pcm16_to_audio_buffer(
    bytes: &[u8],
    sample_rate: u32,
    channels: u16,
) -> Result<AudioBuffer, CodecError> {
    if channels == 0 {
        return Err(CodecError::NoChannels);
    }

    let frame_bytes = 2 * channels as usize;
    if bytes.len() % frame_bytes != 0 {
        return Err(CodecError::Format {
            byte_len: bytes.len(),
            channels,
            frame_bytes,
        });
    }

    let frame_count = bytes.len() / frame_bytes;
    let mut out: Vec<Vec<f32>> = vec![Vec::with_capacity(frame_count); channels as usize];

    for frame in bytes.chunks_exact(frame_bytes) {
        for (ch, sample_bytes) in frame.chunks_exact(2).enumerate() {
            let sample = i16::from_le_bytes([sample_bytes[0], sample_bytes[1]]);
            out[ch].push(sample as f32 / 32768.0);
        }
    }

    Ok(AudioBuffer {
        channels: out,
        sample_rate,
    })
}

/// Package one captured f32 frame as a base64 PCM16 transport frame
///
/// Samples are clamped to [-1.0, 1.0] before scaling; unclamped conversion
/// wraps around on clipped input and produces loud distortion.
pub fn frame_to_transport(samples: &[f32], sample_rate: u32) -> TransportFrame {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32);
        bytes.extend_from_slice(&(scaled as i16).to_le_bytes());
    }

    TransportFrame {
        data: encode_base64(&bytes),
        mime_type: format!("audio/pcm;rate={}", sample_rate),
    }
}

/// Decode an inbound transport frame into a playback buffer
pub fn transport_to_audio_buffer(
    frame: &TransportFrame,
    sample_rate: u32,
    channels: u16,
) -> Result<AudioBuffer, CodecError> {
    let bytes = decode_base64(&frame.data)?;
    pcm16_to_audio_buffer(&bytes, sample_rate, channels)
}
