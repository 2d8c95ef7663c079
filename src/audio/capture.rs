use anyhow::{Context, Result};
use hound::WavReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// One captured microphone frame (normalized mono f32 samples)
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    /// Samples in [-1.0, 1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for capture backends
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Processing sample rate (the live model expects 16kHz)
    pub sample_rate: u32,
    /// Samples per emitted frame
    pub frame_samples: usize,
    /// Pace fixture playback in real time instead of emitting as fast as possible
    pub realtime: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz processing context
            frame_samples: 4096,
            realtime: false,
        }
    }
}

/// Microphone capture seam
///
/// Platform-specific implementations:
/// - OS microphone: device capture, left to deployment builds
/// - Fixture: read frames from a WAV file (testing, replay)
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive capture frames
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Capture source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// OS microphone input
    Microphone,
    /// WAV file input (for testing/replay)
    Fixture(PathBuf),
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(source: CaptureSource, config: CaptureConfig) -> Result<Box<dyn CaptureBackend>> {
        match source {
            CaptureSource::Microphone => {
                anyhow::bail!("Microphone capture requires an OS audio backend; none is compiled in")
            }

            CaptureSource::Fixture(path) => Ok(Box::new(FixtureBackend::new(path, config))),
        }
    }
}

/// Reads a WAV file and emits it as fixed-size mono frames
pub struct FixtureBackend {
    path: PathBuf,
    config: CaptureConfig,
    is_capturing: Arc<AtomicBool>,
}

impl FixtureBackend {
    pub fn new(path: PathBuf, config: CaptureConfig) -> Self {
        Self {
            path,
            config,
            is_capturing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Load the fixture as normalized mono samples at the target rate
    fn load_samples(&self) -> Result<Vec<f32>> {
        let reader = WavReader::open(&self.path)
            .with_context(|| format!("Failed to open fixture WAV: {:?}", self.path))?;

        let spec = reader.spec();
        let raw: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read fixture samples")?;

        info!(
            "Fixture loaded: {:?} ({}Hz, {} channels, {} samples)",
            self.path,
            spec.sample_rate,
            spec.channels,
            raw.len()
        );

        // Average interleaved channels down to mono
        let mono: Vec<f32> = if spec.channels <= 1 {
            raw.iter().map(|&s| s as f32 / 32768.0).collect()
        } else {
            raw.chunks_exact(spec.channels as usize)
                .map(|frame| {
                    let sum: f32 = frame.iter().map(|&s| s as f32 / 32768.0).sum();
                    sum / spec.channels as f32
                })
                .collect()
        };

        // Decimate down to the processing rate (no upsampling)
        if spec.sample_rate > self.config.sample_rate {
            let ratio = spec.sample_rate / self.config.sample_rate;
            if ratio > 1 {
                return Ok(mono.iter().step_by(ratio as usize).copied().collect());
            }
        }

        Ok(mono)
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FixtureBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>> {
        let samples = self.load_samples()?;
        let (tx, rx) = mpsc::channel(32);

        self.is_capturing.store(true, Ordering::SeqCst);

        let is_capturing = Arc::clone(&self.is_capturing);
        let sample_rate = self.config.sample_rate;
        let frame_samples = self.config.frame_samples;
        let realtime = self.config.realtime;

        tokio::spawn(async move {
            let frame_duration_ms = frame_samples as u64 * 1000 / sample_rate as u64;
            let mut timestamp_ms = 0u64;

            for chunk in samples.chunks(frame_samples) {
                if !is_capturing.load(Ordering::SeqCst) {
                    break;
                }

                let frame = CaptureFrame {
                    samples: chunk.to_vec(),
                    sample_rate,
                    timestamp_ms,
                };

                if tx.send(frame).await.is_err() {
                    debug!("Capture receiver dropped, stopping fixture playback");
                    break;
                }

                timestamp_ms += frame_duration_ms;

                if realtime {
                    tokio::time::sleep(std::time::Duration::from_millis(frame_duration_ms)).await;
                }
            }

            is_capturing.store(false, Ordering::SeqCst);
            debug!("Fixture capture finished");
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.is_capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "fixture"
    }
}
