// Tests for the output scheduling clock
//
// The scheduler must place sequentially arriving buffers back-to-back with
// no gaps or overlaps, never schedule into the past, and cut everything on
// interruption.

use arealine_voice::audio::codec::AudioBuffer;
use arealine_voice::audio::playback::{
    NullSink, OutputClock, OutputScheduler, SpeakerSink, WavTapSink,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Test clock set explicitly by the test body
struct ManualClock(AtomicU64);

impl ManualClock {
    fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    fn set(&self, secs: f64) {
        self.0.store(secs.to_bits(), Ordering::SeqCst);
    }
}

impl OutputClock for ManualClock {
    fn now_secs(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }
}

/// Sink recording begin/cancel calls for assertions
#[derive(Clone, Default)]
struct RecordingSink {
    begun: Arc<Mutex<Vec<(u64, f64)>>>,
    cancelled: Arc<Mutex<Vec<u64>>>,
}

impl SpeakerSink for RecordingSink {
    fn begin(&mut self, source_id: u64, _buffer: &AudioBuffer, start_at: f64) -> anyhow::Result<()> {
        self.begun.lock().unwrap().push((source_id, start_at));
        Ok(())
    }

    fn cancel(&mut self, source_id: u64) {
        self.cancelled.lock().unwrap().push(source_id);
    }
}

fn buffer_of(duration_secs: f64) -> AudioBuffer {
    let sample_rate = 1000u32;
    AudioBuffer {
        channels: vec![vec![0.0; (duration_secs * sample_rate as f64).round() as usize]],
        sample_rate,
    }
}

#[test]
fn test_sequential_buffers_play_back_to_back() {
    let clock = Arc::new(ManualClock::new());
    clock.set(10.0);
    let mut scheduler = OutputScheduler::new(clock.clone(), Box::new(NullSink));

    // Durations 1.0s, 0.5s, 2.0s enqueued at the same instant
    let s1 = scheduler.enqueue(&buffer_of(1.0)).unwrap();
    let s2 = scheduler.enqueue(&buffer_of(0.5)).unwrap();
    let s3 = scheduler.enqueue(&buffer_of(2.0)).unwrap();

    assert_eq!(s1, 10.0);
    assert_eq!(s2, 11.0);
    assert_eq!(s3, 11.5);
    assert_eq!(scheduler.next_start_time(), 13.5);
}

#[test]
fn test_cursor_catches_up_to_the_clock() {
    let clock = Arc::new(ManualClock::new());
    let mut scheduler = OutputScheduler::new(clock.clone(), Box::new(NullSink));

    scheduler.enqueue(&buffer_of(0.5)).unwrap();

    // The first buffer finished long ago; the next one starts now, not at
    // the old cursor
    clock.set(4.0);
    let start = scheduler.enqueue(&buffer_of(1.0)).unwrap();
    assert_eq!(start, 4.0);
}

#[test]
fn test_interrupt_clears_active_and_resets_cursor() {
    let clock = Arc::new(ManualClock::new());
    clock.set(2.0);
    let sink = RecordingSink::default();
    let cancelled = Arc::clone(&sink.cancelled);
    let mut scheduler = OutputScheduler::new(clock.clone(), Box::new(sink));

    scheduler.enqueue(&buffer_of(1.0)).unwrap();
    scheduler.enqueue(&buffer_of(1.0)).unwrap();
    scheduler.enqueue(&buffer_of(1.0)).unwrap();
    assert_eq!(scheduler.active_sources(), 3);

    scheduler.interrupt_all();

    assert_eq!(scheduler.active_sources(), 0);
    assert_eq!(cancelled.lock().unwrap().len(), 3);

    // Next enqueue starts at the current clock time, not the old cursor
    clock.set(2.5);
    let start = scheduler.enqueue(&buffer_of(1.0)).unwrap();
    assert_eq!(start, 2.5);
}

#[test]
fn test_interrupt_tolerates_finished_sources() {
    let clock = Arc::new(ManualClock::new());
    let mut scheduler = OutputScheduler::new(clock.clone(), Box::new(NullSink));

    scheduler.enqueue(&buffer_of(0.1)).unwrap();
    clock.set(5.0); // buffer long finished

    // Must not panic even though the source already completed
    scheduler.interrupt_all();
    assert_eq!(scheduler.active_sources(), 0);
}

#[test]
fn test_interrupt_on_empty_scheduler_is_noop() {
    let clock = Arc::new(ManualClock::new());
    let mut scheduler = OutputScheduler::new(clock, Box::new(NullSink));

    scheduler.interrupt_all();
    scheduler.interrupt_all();
    assert_eq!(scheduler.active_sources(), 0);
}

#[test]
fn test_sink_receives_scheduled_start_times() {
    let clock = Arc::new(ManualClock::new());
    clock.set(1.0);
    let sink = RecordingSink::default();
    let begun = Arc::clone(&sink.begun);
    let mut scheduler = OutputScheduler::new(clock, Box::new(sink));

    scheduler.enqueue(&buffer_of(2.0)).unwrap();
    scheduler.enqueue(&buffer_of(1.0)).unwrap();

    let calls = begun.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, 1.0);
    assert_eq!(calls[1].1, 3.0);
}

#[test]
fn test_wav_tap_writes_scheduled_timeline() {
    let dir = tempfile::tempdir().unwrap();
    let tap_path = dir.path().join("tap.wav");

    let clock = Arc::new(ManualClock::new());
    let tap = WavTapSink::create(&tap_path, 1000).unwrap();
    let mut scheduler = OutputScheduler::new(clock, Box::new(tap));

    scheduler.enqueue(&buffer_of(1.0)).unwrap();
    scheduler.enqueue(&buffer_of(0.5)).unwrap();
    drop(scheduler); // finalizes the tap

    let reader = hound::WavReader::open(&tap_path).unwrap();
    assert_eq!(reader.spec().sample_rate, 1000);
    assert_eq!(reader.spec().channels, 1);
    // 1.0s + 0.5s of contiguous audio at 1kHz
    assert_eq!(reader.len(), 1500);
}
