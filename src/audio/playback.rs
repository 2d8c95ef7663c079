// Output scheduling clock for gapless assistant speech
//
// Inbound audio chunks arrive asynchronously and out of sync with wall-clock
// time. The scheduler places each decoded buffer immediately after the
// previous one on a shared output clock, so chunks play back-to-back without
// gaps or overlaps, and can cut all in-flight playback when the server
// signals an interruption.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::codec::AudioBuffer;

/// A monotonically advancing audio output clock, in seconds
pub trait OutputClock: Send + Sync {
    fn now_secs(&self) -> f64;
}

/// Wall clock anchored at creation, standing in for the output device clock
pub struct WallClock {
    epoch: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputClock for WallClock {
    fn now_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Playback device seam
///
/// `begin` schedules a buffer to start at `start_at` on the output clock;
/// `cancel` stops a scheduled source. Cancelling an unknown or
/// already-finished source must be a no-op.
pub trait SpeakerSink: Send + Sync {
    fn begin(&mut self, source_id: u64, buffer: &AudioBuffer, start_at: f64) -> Result<()>;
    fn cancel(&mut self, source_id: u64);
}

/// Sink that discards audio (headless deployments, tests)
pub struct NullSink;

impl SpeakerSink for NullSink {
    fn begin(&mut self, _source_id: u64, _buffer: &AudioBuffer, _start_at: f64) -> Result<()> {
        Ok(())
    }

    fn cancel(&mut self, _source_id: u64) {}
}

/// Diagnostic sink that writes the scheduled timeline to a WAV file
///
/// Buffers are written at their scheduled offsets with silence padding the
/// gaps. Audio is written eagerly on `begin`, so cancellation does not
/// retract already-written samples.
pub struct WavTapSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    sample_rate: u32,
    written_until: f64,
}

impl WavTapSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(path.as_ref(), spec)
            .with_context(|| format!("Failed to create playback tap: {:?}", path.as_ref()))?;

        Ok(Self {
            writer: Some(writer),
            sample_rate,
            written_until: 0.0,
        })
    }
}

impl SpeakerSink for WavTapSink {
    fn begin(&mut self, source_id: u64, buffer: &AudioBuffer, start_at: f64) -> Result<()> {
        let Some(writer) = &mut self.writer else {
            return Ok(());
        };

        // Pad silence up to the scheduled start
        if start_at > self.written_until {
            let gap_samples = ((start_at - self.written_until) * self.sample_rate as f64) as usize;
            for _ in 0..gap_samples {
                writer.write_sample(0i16).context("Failed to write tap silence")?;
            }
        }

        // Channel 0 only; the tap is a mono diagnostic trace
        if let Some(channel) = buffer.channels.first() {
            for &sample in channel {
                let scaled = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
                writer.write_sample(scaled).context("Failed to write tap sample")?;
            }
        }

        self.written_until = start_at + buffer.duration_secs();
        debug!(
            "Tap wrote source {} at {:.3}s ({} frames)",
            source_id,
            start_at,
            buffer.frame_count()
        );

        Ok(())
    }

    fn cancel(&mut self, _source_id: u64) {}
}

impl Drop for WavTapSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize playback tap on drop: {}", e);
            }
        }
    }
}

/// Gapless playback scheduler over a shared output clock
pub struct OutputScheduler {
    clock: Arc<dyn OutputClock>,
    sink: Box<dyn SpeakerSink>,
    /// Next free slot on the output clock (seconds)
    next_start_time: f64,
    /// Currently scheduled sources (source id -> scheduled end time)
    active: HashMap<u64, f64>,
    next_source_id: u64,
}

impl OutputScheduler {
    pub fn new(clock: Arc<dyn OutputClock>, sink: Box<dyn SpeakerSink>) -> Self {
        Self {
            clock,
            sink,
            next_start_time: 0.0,
            active: HashMap::new(),
            next_source_id: 0,
        }
    }

    /// Schedule a buffer immediately after the last enqueued one
    ///
    /// The start time is the later of the cursor and the current clock time,
    /// so playback never overlaps the previous buffer and never schedules
    /// into the past. Returns the scheduled start time.
    pub fn enqueue(&mut self, buffer: &AudioBuffer) -> Result<f64> {
        let now = self.clock.now_secs();
        self.reap_finished(now);

        let start_at = self.next_start_time.max(now);

        let source_id = self.next_source_id;
        self.next_source_id += 1;

        self.sink.begin(source_id, buffer, start_at)?;

        self.next_start_time = start_at + buffer.duration_secs();
        self.active.insert(source_id, self.next_start_time);

        debug!(
            "Scheduled source {} at {:.3}s ({:.3}s long, {} active)",
            source_id,
            start_at,
            buffer.duration_secs(),
            self.active.len()
        );

        Ok(start_at)
    }

    /// Stop all in-flight playback and reset the cursor
    ///
    /// The next enqueue starts fresh at the current clock time. Sources that
    /// already finished are cancelled harmlessly (sink cancel is a no-op for
    /// unknown ids).
    pub fn interrupt_all(&mut self) {
        for &source_id in self.active.keys() {
            self.sink.cancel(source_id);
        }
        self.active.clear();
        self.next_start_time = 0.0;
    }

    /// Number of sources still scheduled or playing
    pub fn active_sources(&mut self) -> usize {
        let now = self.clock.now_secs();
        self.reap_finished(now);
        self.active.len()
    }

    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    /// Drop sources whose scheduled end has passed (natural completion)
    fn reap_finished(&mut self, now: f64) {
        self.active.retain(|_, &mut end| end > now);
    }
}
