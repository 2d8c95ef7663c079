use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::transcript::{ChatEntry, ChatLog, Speaker, TranscriptAccumulator};
use crate::audio::{
    codec, AmbientBed, AudioBuffer, CaptureBackend, CaptureBackendFactory, CaptureConfig,
    CaptureSource, NullSink, OutputClock, OutputScheduler, SpeakerSink, WallClock, WavTapSink,
};
use crate::config::Config;
use crate::live::{
    AnnounceReply, AnnounceRequest, LiveSession, ResponseModality, ServerEvent, SessionSetup,
    SessionSignal,
};

/// Snapshot of the assistant's state for the control surface
#[derive(Debug, Clone, Serialize)]
pub struct AssistantStatus {
    pub listening: bool,
    pub frames_sent: usize,
    pub events_received: usize,
    pub active_sources: usize,
    pub chat_entries: usize,
    pub ambient_gain: f32,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}

/// The UI-facing orchestrator
///
/// Owns the capture backend, live session, output scheduler, ambient bed,
/// transcript accumulators and chat log. Capture frames flow out through
/// the session; inbound events are dispatched strictly in arrival order.
pub struct AssistantSession {
    config: Config,

    /// When the assistant was constructed
    started_at: DateTime<Utc>,

    /// Shared output clock driving the scheduler and ambient bed
    clock: Arc<dyn OutputClock>,

    /// Whether the voice session is live
    is_listening: Arc<AtomicBool>,

    /// Outbound media frames forwarded so far
    frames_sent: Arc<AtomicUsize>,

    /// Inbound server events dispatched so far
    events_received: Arc<AtomicUsize>,

    /// Displayed conversation
    chat_log: Arc<Mutex<ChatLog>>,

    /// Per-turn streaming transcript buffers
    accumulator: Arc<Mutex<TranscriptAccumulator>>,

    /// Gapless playback scheduler on the shared output clock
    scheduler: Arc<Mutex<OutputScheduler>>,

    /// Background bed ducked under assistant speech
    ambient: Arc<Mutex<AmbientBed>>,

    /// Open live session, when listening
    live: Arc<Mutex<Option<Arc<LiveSession>>>>,

    /// Active capture backend, when listening
    capture: Mutex<Option<Box<dyn CaptureBackend>>>,

    /// Handle for the capture-tap task
    capture_task: Mutex<Option<JoinHandle<()>>>,

    /// Handle for the inbound-event task
    event_task: Mutex<Option<JoinHandle<()>>>,

    /// Serializes start/stop transitions; HTTP requests arrive concurrently
    control_lock: Mutex<()>,
}

impl AssistantSession {
    /// Build the assistant: output clock, scheduler, ambient bed, seeded chat
    ///
    /// No I/O happens here; the live session opens on `toggle_listening`.
    pub fn new(config: Config) -> Result<Self> {
        let clock: Arc<dyn OutputClock> = Arc::new(WallClock::new());

        let sink: Box<dyn SpeakerSink> = match &config.audio.playback_tap {
            Some(path) => Box::new(
                WavTapSink::create(path, config.audio.playback_sample_rate)
                    .context("Failed to create playback tap")?,
            ),
            None => Box::new(NullSink),
        };

        let scheduler = OutputScheduler::new(Arc::clone(&clock), sink);
        let ambient = AmbientBed::new(Arc::clone(&clock));

        let mut chat_log = ChatLog::new();
        chat_log.push(Speaker::Assistant, config.assistant.greeting.clone());

        Ok(Self {
            config,
            started_at: Utc::now(),
            clock,
            is_listening: Arc::new(AtomicBool::new(false)),
            frames_sent: Arc::new(AtomicUsize::new(0)),
            events_received: Arc::new(AtomicUsize::new(0)),
            chat_log: Arc::new(Mutex::new(chat_log)),
            accumulator: Arc::new(Mutex::new(TranscriptAccumulator::new())),
            scheduler: Arc::new(Mutex::new(scheduler)),
            ambient: Arc::new(Mutex::new(ambient)),
            live: Arc::new(Mutex::new(None)),
            capture: Mutex::new(None),
            capture_task: Mutex::new(None),
            event_task: Mutex::new(None),
            control_lock: Mutex::new(()),
        })
    }

    /// Start listening if off, stop if on; returns the new listening state
    ///
    /// Transitions are serialized: concurrent toggles queue up rather than
    /// opening two sessions over the same state. On a failed start the
    /// listening state reverts to off. With `assistant.strict_errors` the
    /// failure propagates; otherwise it is logged and swallowed, like the
    /// original silent degradation.
    pub async fn toggle_listening(&self) -> Result<bool> {
        let _guard = self.control_lock.lock().await;

        if self.is_listening.load(Ordering::SeqCst) {
            self.stop_inner().await?;
            return Ok(false);
        }

        match self.start_listening().await {
            Ok(()) => Ok(true),
            Err(e) => {
                if let Err(stop_err) = self.stop_inner().await {
                    warn!("Cleanup after failed start also failed: {}", stop_err);
                }

                if self.config.assistant.strict_errors {
                    Err(e)
                } else {
                    warn!("Failed to start listening: {:#}", e);
                    Ok(false)
                }
            }
        }
    }

    async fn start_listening(&self) -> Result<()> {
        info!("Starting voice session");

        self.accumulator.lock().await.reset();

        let setup = SessionSetup {
            session_id: format!("simi-{}", uuid::Uuid::new_v4()),
            persona: self.config.assistant.persona.clone(),
            response_modality: ResponseModality::Audio,
            voice: self.config.assistant.voice.clone(),
        };

        let (session, signals) = LiveSession::open(
            &self.config.grid.url,
            self.config.grid.auth_token.clone(),
            setup,
            self.config.audio.capture_sample_rate,
        )
        .await
        .context("Failed to open live session")?;

        let session = Arc::new(session);
        {
            let mut live = self.live.lock().await;
            *live = Some(Arc::clone(&session));
        }

        // Duck the ambient bed while the conversation runs
        self.ambient.lock().await.pause_for_voice();

        let source = match &self.config.audio.fixture_path {
            Some(path) => CaptureSource::Fixture(path.into()),
            None => CaptureSource::Microphone,
        };

        let capture_config = CaptureConfig {
            sample_rate: self.config.audio.capture_sample_rate,
            frame_samples: self.config.audio.frame_samples,
            realtime: true,
        };

        let mut backend = CaptureBackendFactory::create(source, capture_config)
            .context("Failed to create capture backend")?;

        let mut frame_rx = backend
            .start()
            .await
            .context("Failed to start audio capture")?;

        {
            let mut capture = self.capture.lock().await;
            *capture = Some(backend);
        }

        self.is_listening.store(true, Ordering::SeqCst);

        // Capture tap: package each frame and forward it, fire-and-forget
        let tap_session = Arc::clone(&session);
        let tap_listening = Arc::clone(&self.is_listening);
        let frames_sent = Arc::clone(&self.frames_sent);

        let capture_task = tokio::spawn(async move {
            debug!("Capture tap started");

            while let Some(frame) = frame_rx.recv().await {
                if !tap_listening.load(Ordering::SeqCst) {
                    break;
                }

                let transport = codec::frame_to_transport(&frame.samples, frame.sample_rate);
                if let Err(e) = tap_session.send(transport).await {
                    debug!("Frame send failed: {}", e);
                }

                frames_sent.fetch_add(1, Ordering::SeqCst);
            }

            debug!("Capture tap stopped");
        });

        {
            let mut handle = self.capture_task.lock().await;
            *handle = Some(capture_task);
        }

        // Inbound events: single consumer keeps arrival order
        let event_task = tokio::spawn(Self::run_event_loop(
            signals,
            Arc::clone(&self.is_listening),
            Arc::clone(&self.events_received),
            Arc::clone(&self.scheduler),
            Arc::clone(&self.chat_log),
            Arc::clone(&self.accumulator),
            Arc::clone(&self.ambient),
            Arc::clone(&self.live),
            self.config.audio.playback_sample_rate,
        ));

        {
            let mut handle = self.event_task.lock().await;
            *handle = Some(event_task);
        }

        info!("Voice session started");

        Ok(())
    }

    /// Stop listening: release capture, close the session, reset playback
    ///
    /// Idempotent and safe to call from error paths, including before a
    /// start ever happened.
    pub async fn stop(&self) -> Result<()> {
        let _guard = self.control_lock.lock().await;
        self.stop_inner().await
    }

    async fn stop_inner(&self) -> Result<()> {
        if self.is_listening.swap(false, Ordering::SeqCst) {
            info!("Stopping voice session");
        }

        {
            let mut capture = self.capture.lock().await;
            if let Some(mut backend) = capture.take() {
                if let Err(e) = backend.stop().await {
                    warn!("Failed to stop capture backend: {}", e);
                }
            }
        }

        {
            let mut live = self.live.lock().await;
            if let Some(session) = live.take() {
                session.close().await;
            }
        }

        {
            let mut handle = self.capture_task.lock().await;
            if let Some(task) = handle.take() {
                if let Err(e) = task.await {
                    error!("Capture tap panicked: {}", e);
                }
            }
        }

        {
            let mut handle = self.event_task.lock().await;
            if let Some(task) = handle.take() {
                if let Err(e) = task.await {
                    error!("Event task panicked: {}", e);
                }
            }
        }

        self.scheduler.lock().await.interrupt_all();
        self.ambient.lock().await.resume_after_voice();

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_event_loop(
        mut signals: mpsc::Receiver<SessionSignal>,
        is_listening: Arc<AtomicBool>,
        events_received: Arc<AtomicUsize>,
        scheduler: Arc<Mutex<OutputScheduler>>,
        chat_log: Arc<Mutex<ChatLog>>,
        accumulator: Arc<Mutex<TranscriptAccumulator>>,
        ambient: Arc<Mutex<AmbientBed>>,
        live: Arc<Mutex<Option<Arc<LiveSession>>>>,
        playback_sample_rate: u32,
    ) {
        debug!("Event task started");

        while let Some(signal) = signals.recv().await {
            match signal {
                SessionSignal::Opened => {
                    debug!("Session reported open");
                }
                SessionSignal::Event(event) => {
                    events_received.fetch_add(1, Ordering::SeqCst);
                    Self::dispatch_event(
                        event,
                        &scheduler,
                        &chat_log,
                        &accumulator,
                        playback_sample_rate,
                    )
                    .await;
                }
                SessionSignal::Error(message) => {
                    error!("Session error: {}", message);
                    Self::teardown_after_session_end(&is_listening, &scheduler, &ambient, &live)
                        .await;
                    break;
                }
                SessionSignal::Closed => {
                    info!("Session closed by remote");
                    Self::teardown_after_session_end(&is_listening, &scheduler, &ambient, &live)
                        .await;
                    break;
                }
            }
        }

        debug!("Event task stopped");
    }

    /// Cleanup when the session ends from the remote side
    ///
    /// The listening flag drops, the stale session handle is closed and
    /// released, playback is cut, and the ambient bed ramps back up without
    /// waiting for the user to issue a stop.
    async fn teardown_after_session_end(
        is_listening: &AtomicBool,
        scheduler: &Mutex<OutputScheduler>,
        ambient: &Mutex<AmbientBed>,
        live: &Mutex<Option<Arc<LiveSession>>>,
    ) {
        is_listening.store(false, Ordering::SeqCst);

        if let Some(session) = live.lock().await.take() {
            session.close().await;
        }

        scheduler.lock().await.interrupt_all();
        ambient.lock().await.resume_after_voice();
    }

    /// Dispatch one inbound server event
    ///
    /// An interruption only cuts audio; the session itself stays live.
    /// Malformed audio chunks are dropped, never fatal.
    async fn dispatch_event(
        event: ServerEvent,
        scheduler: &Mutex<OutputScheduler>,
        chat_log: &Mutex<ChatLog>,
        accumulator: &Mutex<TranscriptAccumulator>,
        playback_sample_rate: u32,
    ) {
        match event {
            ServerEvent::Interrupted => {
                debug!("Interrupted: cutting in-flight playback");
                scheduler.lock().await.interrupt_all();
            }

            ServerEvent::InlineAudio { media } => {
                match codec::transport_to_audio_buffer(&media, playback_sample_rate, 1) {
                    Ok(buffer) => {
                        if let Err(e) = scheduler.lock().await.enqueue(&buffer) {
                            warn!("Failed to schedule audio chunk: {}", e);
                        }
                    }
                    Err(e) => {
                        warn!("Dropping malformed audio chunk: {}", e);
                    }
                }
            }

            ServerEvent::OutputTranscript { text } => {
                let full = {
                    let mut acc = accumulator.lock().await;
                    acc.append(Speaker::Assistant, &text).to_string()
                };
                chat_log.lock().await.upsert(Speaker::Assistant, full);
            }

            ServerEvent::InputTranscript { text } => {
                let full = {
                    let mut acc = accumulator.lock().await;
                    acc.append(Speaker::User, &text).to_string()
                };
                chat_log.lock().await.upsert(Speaker::User, full);
            }

            ServerEvent::TurnComplete => {
                accumulator.lock().await.reset();
            }
        }
    }

    /// Apply one inbound event directly (the event task goes through here
    /// in spirit; exposed for driving the assistant without a transport)
    pub async fn apply_event(&self, event: ServerEvent) {
        self.events_received.fetch_add(1, Ordering::SeqCst);
        Self::dispatch_event(
            event,
            &self.scheduler,
            &self.chat_log,
            &self.accumulator,
            self.config.audio.playback_sample_rate,
        )
        .await;
    }

    /// Append a typed user message to the chat log
    pub async fn send_text(&self, text: &str) {
        self.chat_log.lock().await.push(Speaker::User, text.to_string());
    }

    /// One-shot TTS announcement, played through the scheduler
    pub async fn announce(&self, text: &str) -> Result<()> {
        info!("Announcing: {}", text);

        let request = AnnounceRequest {
            text: text.to_string(),
            voice: self.config.assistant.voice.clone(),
        };

        let options = match self.config.grid.auth_token.clone() {
            Some(token) => async_nats::ConnectOptions::with_token(token),
            None => async_nats::ConnectOptions::new(),
        };

        let client = options
            .connect(&self.config.grid.url)
            .await
            .context("Failed to connect to the grid")?;

        let reply = client
            .request("voice.tts.say".to_string(), serde_json::to_vec(&request)?.into())
            .await
            .context("TTS announce request failed")?;

        let reply: AnnounceReply =
            serde_json::from_slice(&reply.payload).context("Malformed TTS reply")?;

        let bytes = codec::decode_base64(&reply.audio)?;
        let buffer = codec::pcm16_to_audio_buffer(&bytes, reply.sample_rate, 1)?;

        self.play_announcement(buffer).await
    }

    /// Duck the ambient bed, schedule the buffer, restore the bed afterwards
    ///
    /// The bed ramps back up once the buffer's scheduled playback ends,
    /// unless a voice session is running, in which case its own stop path
    /// owns the resume.
    pub async fn play_announcement(&self, buffer: AudioBuffer) -> Result<()> {
        self.ambient.lock().await.pause_for_voice();

        let start_at = match self.scheduler.lock().await.enqueue(&buffer) {
            Ok(start_at) => start_at,
            Err(e) => {
                self.ambient.lock().await.resume_after_voice();
                return Err(e);
            }
        };

        let resume_at = start_at + buffer.duration_secs();
        let delay = (resume_at - self.clock.now_secs()).max(0.0);

        let ambient = Arc::clone(&self.ambient);
        let is_listening = Arc::clone(&self.is_listening);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            if !is_listening.load(Ordering::SeqCst) {
                ambient.lock().await.resume_after_voice();
            }
        });

        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.is_listening.load(Ordering::SeqCst)
    }

    /// Current chat log entries
    pub async fn chat(&self) -> Vec<ChatEntry> {
        self.chat_log.lock().await.entries().to_vec()
    }

    /// Current assistant statistics
    pub async fn status(&self) -> AssistantStatus {
        let duration = Utc::now().signed_duration_since(self.started_at);

        AssistantStatus {
            listening: self.is_listening.load(Ordering::SeqCst),
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            events_received: self.events_received.load(Ordering::SeqCst),
            active_sources: self.scheduler.lock().await.active_sources(),
            chat_entries: self.chat_log.lock().await.len(),
            ambient_gain: self.ambient.lock().await.current_gain(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        }
    }
}
