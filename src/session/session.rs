use super::config::SessionConfig;
use super::stats::{SessionState, SessionStats};
use crate::audio::{pcm, AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame};
use crate::transcript::{self, TranscriptState};
use crate::ws::{ServerMessage, WsClient, WsSender};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything the session reacts to, funneled through one channel so
/// handling is in-order and non-overlapping.
enum SessionEvent {
    /// A connection was established; the sink moves into the dispatch loop
    Connected(WsSender),
    /// One captured audio frame, ready for conversion and sending
    Audio(AudioFrame),
    /// A recognized message from the service
    Server(ServerMessage),
    /// Language selection changed
    SetLanguage(String),
    /// Report a client-side failure to the service
    ClientError(String),
    /// The socket closed or errored
    Disconnected,
    /// The capture channel drained after a stop
    CaptureEnded,
    /// Tear the session down
    Shutdown,
}

#[derive(Default)]
struct Counters {
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    frames_dropped: AtomicU64,
    partials_received: AtomicU64,
    finals_received: AtomicU64,
}

/// A streaming session that owns the service connection, audio capture,
/// and transcript state.
///
/// All socket and capture callbacks are forwarded as [`SessionEvent`]s into
/// a single dispatch task, so no two handlers ever run concurrently.
pub struct StreamingSession {
    config: SessionConfig,

    /// When the session was created
    started_at: chrono::DateTime<chrono::Utc>,

    /// Lifecycle state, updated by commands and by the dispatch loop
    state: Arc<Mutex<SessionState>>,

    /// Whether a connection is currently open
    connected: Arc<AtomicBool>,

    /// Committed + partial transcript text
    transcript: Arc<Mutex<TranscriptState>>,

    /// Status indicator text (mirrors service info/error messages)
    status: Arc<Mutex<String>>,

    /// Last error message from the service, kept for diagnostics
    last_error: Arc<Mutex<Option<String>>>,

    /// Currently selected language code
    language: Arc<Mutex<String>>,

    counters: Arc<Counters>,

    /// Active capture backend, present only while capturing
    backend: Arc<Mutex<Option<Box<dyn AudioBackend>>>>,

    events_tx: mpsc::Sender<SessionEvent>,

    /// Handle for the dispatch task
    dispatch_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl StreamingSession {
    /// Create a session in the idle state. The dispatch loop starts
    /// immediately; no connection is opened until [`start`](Self::start).
    pub fn new(config: SessionConfig) -> Self {
        info!("Creating streaming session: {}", config.session_id);

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let state = Arc::new(Mutex::new(SessionState::Idle));
        let connected = Arc::new(AtomicBool::new(false));
        let transcript = Arc::new(Mutex::new(TranscriptState::new()));
        let status = Arc::new(Mutex::new("idle".to_string()));
        let last_error = Arc::new(Mutex::new(None));
        let language = Arc::new(Mutex::new(config.language.clone()));
        let counters = Arc::new(Counters::default());

        let dispatch = Dispatch {
            state: Arc::clone(&state),
            connected: Arc::clone(&connected),
            transcript: Arc::clone(&transcript),
            status: Arc::clone(&status),
            last_error: Arc::clone(&last_error),
            language: Arc::clone(&language),
            counters: Arc::clone(&counters),
            echo: config.echo_transcript,
            sink: None,
        };

        let dispatch_handle = tokio::spawn(dispatch.run(events_rx));

        Self {
            config,
            started_at: Utc::now(),
            state,
            connected,
            transcript,
            status,
            last_error,
            language,
            counters,
            backend: Arc::new(Mutex::new(None)),
            events_tx,
            dispatch_handle: Arc::new(Mutex::new(Some(dispatch_handle))),
        }
    }

    /// Start streaming: connect if not connected, send the language control
    /// message, and begin capturing audio.
    pub async fn start(&self) -> Result<()> {
        {
            let state = self.state.lock().await;
            if *state == SessionState::Streaming {
                warn!("Session already streaming");
                return Ok(());
            }
        }

        if !self.connected.load(Ordering::SeqCst) {
            *self.state.lock().await = SessionState::Connecting;

            match WsClient::connect(&self.config.server_url).await {
                Ok((sender, mut receiver)) => {
                    // The dispatch loop takes ownership of the sink and
                    // sends the initial control message.
                    self.send_event(SessionEvent::Connected(sender)).await?;

                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        while let Some(msg) = receiver.next().await {
                            if events.send(SessionEvent::Server(msg)).await.is_err() {
                                return;
                            }
                        }
                        let _ = events.send(SessionEvent::Disconnected).await;
                    });
                }
                Err(e) => {
                    *self.state.lock().await = SessionState::Error;
                    *self.status.lock().await = "connection failed".to_string();
                    return Err(e).context("failed to connect to transcription service");
                }
            }
        }

        let backend_config = AudioBackendConfig {
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            frame_samples: self.config.frame_samples,
            ..AudioBackendConfig::default()
        };

        let mut backend = AudioBackendFactory::create(self.config.source.clone(), backend_config)
            .context("failed to create audio backend")?;

        let mut audio_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                // The connection stays open; only the start action fails.
                let _ = self
                    .events_tx
                    .send(SessionEvent::ClientError(format!(
                        "capture start failed: {e:#}"
                    )))
                    .await;
                *self.state.lock().await = SessionState::Idle;
                return Err(e).context("failed to start audio capture");
            }
        };

        *self.backend.lock().await = Some(backend);

        let events = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = audio_rx.recv().await {
                if events.send(SessionEvent::Audio(frame)).await.is_err() {
                    return;
                }
            }
            let _ = events.send(SessionEvent::CaptureEnded).await;
        });

        *self.state.lock().await = SessionState::Streaming;
        *self.status.lock().await = "streaming".to_string();
        info!("Session streaming: {}", self.config.session_id);

        Ok(())
    }

    /// Stop capturing and release the audio device. The connection stays
    /// open so a later [`start`](Self::start) can resume without
    /// reconnecting.
    pub async fn stop(&self) -> Result<SessionStats> {
        match self.backend.lock().await.take() {
            Some(mut backend) => {
                backend.stop().await.context("failed to stop audio capture")?;
                info!("Capture stopped ({})", backend.name());
            }
            None => warn!("Capture not active"),
        }

        {
            let mut state = self.state.lock().await;
            if *state == SessionState::Streaming {
                *state = SessionState::Idle;
            }
        }

        Ok(self.stats().await)
    }

    /// Tear down the session: stop capture, close the connection, and join
    /// the dispatch task.
    pub async fn close(&self) -> Result<()> {
        if let Some(mut backend) = self.backend.lock().await.take() {
            if let Err(e) = backend.stop().await {
                error!("Failed to stop audio capture: {e:#}");
            }
        }

        let _ = self.events_tx.send(SessionEvent::Shutdown).await;

        if let Some(handle) = self.dispatch_handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Dispatch task panicked: {e}");
            }
        }

        info!("Session closed: {}", self.config.session_id);
        Ok(())
    }

    /// Change the session language. Sent to the service immediately when
    /// connected; otherwise only the stored selection changes, with no
    /// error and nothing sent until the next connect.
    pub async fn set_language(&self, code: impl Into<String>) -> Result<()> {
        self.send_event(SessionEvent::SetLanguage(code.into())).await
    }

    /// Push one frame from a caller-managed source. Frames are dropped
    /// when the connection is not open, matching live capture behavior.
    pub async fn feed_audio(&self, frame: AudioFrame) -> Result<()> {
        self.send_event(SessionEvent::Audio(frame)).await
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Current status indicator text.
    pub async fn status_line(&self) -> String {
        self.status.lock().await.clone()
    }

    /// Last error message received from the service, if any.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Displayed transcript: committed text plus any pending partial.
    pub async fn transcript_text(&self) -> String {
        self.transcript.lock().await.display()
    }

    /// Reset committed and partial text to empty.
    pub async fn clear_transcript(&self) {
        self.transcript.lock().await.clear();
    }

    /// Copy the displayed transcript to the system clipboard.
    pub async fn copy_transcript(&self) -> Result<()> {
        let text = self.transcript_text().await;
        transcript::copy_to_clipboard(&text)
    }

    /// Save the displayed transcript to a timestamped text file.
    pub async fn save_transcript(&self, dir: &Path) -> Result<PathBuf> {
        let text = self.transcript_text().await;
        transcript::save_transcript(dir, &text)
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            state: *self.state.lock().await,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.counters.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.counters.bytes_sent.load(Ordering::Relaxed),
            frames_dropped: self.counters.frames_dropped.load(Ordering::Relaxed),
            partials_received: self.counters.partials_received.load(Ordering::Relaxed),
            finals_received: self.counters.finals_received.load(Ordering::Relaxed),
        }
    }

    async fn send_event(&self, event: SessionEvent) -> Result<()> {
        self.events_tx
            .send(event)
            .await
            .map_err(|_| anyhow!("session dispatch has shut down"))
    }
}

/// The single-threaded event loop. Owns the outbound sink; every handler
/// runs to completion before the next event is taken.
struct Dispatch {
    state: Arc<Mutex<SessionState>>,
    connected: Arc<AtomicBool>,
    transcript: Arc<Mutex<TranscriptState>>,
    status: Arc<Mutex<String>>,
    last_error: Arc<Mutex<Option<String>>>,
    language: Arc<Mutex<String>>,
    counters: Arc<Counters>,
    echo: bool,
    sink: Option<WsSender>,
}

impl Dispatch {
    async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) {
        debug!("Session dispatch started");

        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Connected(mut sink) => {
                    let language = self.language.lock().await.clone();
                    if let Err(e) = sink.send_control(&language).await {
                        warn!("Failed to send initial control message: {e:#}");
                        self.mark_disconnected(SessionState::Error).await;
                        continue;
                    }
                    self.sink = Some(sink);
                    self.connected.store(true, Ordering::SeqCst);
                    *self.status.lock().await = "connected".to_string();
                }

                SessionEvent::Audio(frame) => {
                    let Some(sink) = self.sink.as_mut() else {
                        // Not connected: drop the frame, never queue it.
                        self.counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    };

                    let payload = pcm::frame_to_wire(&frame.samples);
                    let len = payload.len() as u64;
                    match sink.send_audio(payload).await {
                        Ok(()) => {
                            self.counters.frames_sent.fetch_add(1, Ordering::Relaxed);
                            self.counters.bytes_sent.fetch_add(len, Ordering::Relaxed);
                        }
                        Err(e) => {
                            warn!("Audio send failed: {e:#}");
                            self.mark_disconnected(SessionState::Error).await;
                        }
                    }
                }

                SessionEvent::Server(msg) => self.handle_server(msg).await,

                SessionEvent::SetLanguage(code) => {
                    *self.language.lock().await = code.clone();
                    // Disconnected: remember the selection, send nothing.
                    if let Some(sink) = self.sink.as_mut() {
                        if let Err(e) = sink.send_control(&code).await {
                            warn!("Failed to send language change: {e:#}");
                            self.mark_disconnected(SessionState::Error).await;
                        }
                    }
                }

                SessionEvent::ClientError(message) => {
                    if let Some(sink) = self.sink.as_mut() {
                        if let Err(e) = sink.send_client_error(&message).await {
                            debug!("Failed to report client error: {e:#}");
                        }
                    }
                }

                SessionEvent::Disconnected => {
                    self.mark_disconnected(SessionState::Closed).await;
                }

                SessionEvent::CaptureEnded => {
                    let mut state = self.state.lock().await;
                    if *state == SessionState::Streaming {
                        *state = SessionState::Idle;
                    }
                }

                SessionEvent::Shutdown => {
                    if let Some(mut sink) = self.sink.take() {
                        if let Err(e) = sink.close().await {
                            debug!("Close frame failed: {e:#}");
                        }
                    }
                    self.connected.store(false, Ordering::SeqCst);
                    let mut state = self.state.lock().await;
                    if *state != SessionState::Error {
                        *state = SessionState::Closed;
                    }
                    break;
                }
            }
        }

        debug!("Session dispatch stopped");
    }

    async fn handle_server(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Partial { text } => {
                self.counters.partials_received.fetch_add(1, Ordering::Relaxed);
                let mut transcript = self.transcript.lock().await;
                transcript.apply_partial(text);
                if self.echo {
                    print!("\r{}", transcript.partial());
                    std::io::stdout().flush().ok();
                }
            }
            ServerMessage::Final { text } => {
                self.counters.finals_received.fetch_add(1, Ordering::Relaxed);
                let mut transcript = self.transcript.lock().await;
                transcript.apply_final(&text);
                if self.echo {
                    println!("\r{}", text.trim());
                }
            }
            ServerMessage::Info { message } => {
                info!("Service: {}", message);
                *self.status.lock().await = message;
            }
            ServerMessage::Error { message } => {
                warn!("Service error: {}", message);
                *self.status.lock().await = "error".to_string();
                *self.last_error.lock().await = Some(message);
            }
        }
    }

    async fn mark_disconnected(&mut self, state: SessionState) {
        self.sink = None;
        self.connected.store(false, Ordering::SeqCst);
        *self.state.lock().await = state;
        *self.status.lock().await = state.label().to_string();
    }
}
