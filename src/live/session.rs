use anyhow::{Context, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::messages::{MediaFrameMessage, ServerEvent, SessionSetup};
use crate::audio::TransportFrame;

/// Lifecycle state of a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
    Errored,
}

const STATE_CONNECTING: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_CLOSED: u8 = 2;
const STATE_ERRORED: u8 = 3;

/// Lifecycle and event signals surfaced to the session consumer
///
/// One mpsc receiver carries everything the original's callback bundle did;
/// a single consumer keeps inbound events strictly in arrival order.
#[derive(Debug)]
pub enum SessionSignal {
    Opened,
    Event(ServerEvent),
    Error(String),
    Closed,
}

/// One open bidirectional connection to the remote voice model
///
/// No reconnection logic: after a close or error the caller opens a fresh
/// session.
pub struct LiveSession {
    session_id: String,
    client: Client,
    state: Arc<AtomicU8>,
    sequence: AtomicU32,
    sample_rate: u32,
    pump_handle: Mutex<Option<JoinHandle<()>>>,
}

impl LiveSession {
    /// Open a session: connect, subscribe to server events, publish the setup bundle
    ///
    /// Returns the session handle alongside the signal receiver feeding
    /// inbound events and lifecycle transitions.
    pub async fn open(
        nats_url: &str,
        auth_token: Option<String>,
        setup: SessionSetup,
        sample_rate: u32,
    ) -> Result<(Self, mpsc::Receiver<SessionSignal>)> {
        let session_id = setup.session_id.clone();
        info!("Opening live session: {}", session_id);

        let state = Arc::new(AtomicU8::new(STATE_CONNECTING));
        let (signal_tx, signal_rx) = mpsc::channel(256);

        let options = match auth_token {
            Some(token) => async_nats::ConnectOptions::with_token(token),
            None => async_nats::ConnectOptions::new(),
        };

        // Transport-level errors surface on the signal stream; the consumer
        // decides whether to tear down
        let error_tx = signal_tx.clone();
        let error_state = Arc::clone(&state);
        let client = options
            .event_callback(move |event| {
                let tx = error_tx.clone();
                let state = Arc::clone(&error_state);
                async move {
                    if let async_nats::Event::ClientError(err) = event {
                        state.store(STATE_ERRORED, Ordering::SeqCst);
                        let _ = tx.send(SessionSignal::Error(err.to_string())).await;
                    }
                }
            })
            .connect(nats_url)
            .await
            .context("Failed to connect to the grid")?;

        let mut subscriber = client
            .subscribe(Self::event_subject(&session_id))
            .await
            .context("Failed to subscribe to session events")?;

        let payload = serde_json::to_vec(&setup)?;
        client
            .publish(Self::open_subject(&session_id), payload.into())
            .await
            .context("Failed to publish session setup")?;

        state.store(STATE_OPEN, Ordering::SeqCst);
        let _ = signal_tx.send(SessionSignal::Opened).await;

        // Pump task: parsed server events flow to the consumer in arrival order
        let pump_state = Arc::clone(&state);
        let pump_session_id = session_id.clone();
        let pump = tokio::spawn(async move {
            debug!("Event pump started for session {}", pump_session_id);

            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<ServerEvent>(&msg.payload) {
                    Ok(event) => {
                        if signal_tx.send(SessionSignal::Event(event)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse server event: {}", e);
                    }
                }
            }

            // Remote close: the event stream ended
            if pump_state.load(Ordering::SeqCst) == STATE_OPEN {
                pump_state.store(STATE_CLOSED, Ordering::SeqCst);
                let _ = signal_tx.send(SessionSignal::Closed).await;
            }

            debug!("Event pump stopped for session {}", pump_session_id);
        });

        info!("Live session open: {}", session_id);

        Ok((
            Self {
                session_id,
                client,
                state,
                sequence: AtomicU32::new(0),
                sample_rate,
                pump_handle: Mutex::new(Some(pump)),
            },
            signal_rx,
        ))
    }

    /// Forward one media frame on the open session
    ///
    /// Fire-and-forget: when the session is not open, or the publish fails,
    /// the frame is dropped with a debug log. Capture taps must never stall
    /// on a send.
    pub async fn send(&self, media: TransportFrame) -> Result<()> {
        if self.state.load(Ordering::SeqCst) != STATE_OPEN {
            debug!("Dropping media frame: session {} not open", self.session_id);
            return Ok(());
        }

        let message = MediaFrameMessage {
            session_id: self.session_id.clone(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            media,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: false,
        };

        let payload = serde_json::to_vec(&message)?;
        if let Err(e) = self
            .client
            .publish(Self::input_subject(&self.session_id), payload.into())
            .await
        {
            debug!("Dropping media frame: publish failed: {}", e);
        }

        Ok(())
    }

    /// Terminate the session
    ///
    /// Safe to call multiple times; teardown never propagates errors.
    pub async fn close(&self) {
        let previous = self.state.swap(STATE_CLOSED, Ordering::SeqCst);
        if previous == STATE_CLOSED {
            return;
        }

        info!("Closing live session: {}", self.session_id);

        // Final marker tells the model the input stream is done
        if previous == STATE_OPEN {
            let message = MediaFrameMessage {
                session_id: self.session_id.clone(),
                sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
                media: TransportFrame::empty(self.sample_rate),
                timestamp: chrono::Utc::now().to_rfc3339(),
                final_frame: true,
            };

            match serde_json::to_vec(&message) {
                Ok(payload) => {
                    if let Err(e) = self
                        .client
                        .publish(Self::input_subject(&self.session_id), payload.into())
                        .await
                    {
                        warn!("Failed to publish final frame marker: {}", e);
                    }
                }
                Err(e) => {
                    warn!("Failed to encode final frame marker: {}", e);
                }
            }
        }

        let mut handle = self.pump_handle.lock().await;
        if let Some(pump) = handle.take() {
            pump.abort();
        }
    }

    pub fn state(&self) -> SessionState {
        match self.state.load(Ordering::SeqCst) {
            STATE_CONNECTING => SessionState::Connecting,
            STATE_OPEN => SessionState::Open,
            STATE_ERRORED => SessionState::Errored,
            _ => SessionState::Closed,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn open_subject(session_id: &str) -> String {
        format!("voice.live.{}.open", session_id)
    }

    fn input_subject(session_id: &str) -> String {
        format!("voice.live.{}.input", session_id)
    }

    fn event_subject(session_id: &str) -> String {
        format!("voice.live.{}.event", session_id)
    }
}
