use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::events::{EventSink, SpeechEvent};
use super::options::{truncate_matches, SessionOptions};
use super::state::{SessionState, SessionStats};
use crate::audio::{AudioBuffer, AudioCapture, AudioCaptureHandle};
use crate::error::SpeechError;
use crate::permission::{Capability, PermissionGate, PermissionStatus};
use crate::recognition::{
    RecognitionEngine, RecognitionEvent, RecognitionFailure, RecognitionResult, RecognitionSession,
};

/// Successful outcome of `start`
///
/// `matches` is absent in partial-results mode, where transcripts travel
/// over the event channel instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<String>>,
}

impl StartResponse {
    fn empty(options: &SessionOptions) -> Self {
        Self {
            matches: (!options.partial_results).then(Vec::new),
        }
    }
}

type StartReply = oneshot::Sender<Result<StartResponse, SpeechError>>;

/// Everything the controller reacts to, from callers and from its own tasks
enum Message {
    Start {
        options: SessionOptions,
        reply: StartReply,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    IsListening {
        reply: oneshot::Sender<bool>,
    },
    Stats {
        reply: oneshot::Sender<SessionStats>,
    },
    MicrophoneDecision {
        token: Uuid,
        status: PermissionStatus,
    },
    Acquired {
        token: Uuid,
        outcome: Result<Acquired, SpeechError>,
    },
    Recognition {
        token: Uuid,
        event: RecognitionEvent,
    },
    ResultsClosed {
        token: Uuid,
    },
}

/// Resources produced by a successful acquisition
struct Acquired {
    capture: AudioCaptureHandle,
    recognition: RecognitionSession,
    audio_rx: mpsc::Receiver<AudioBuffer>,
    results_rx: mpsc::UnboundedReceiver<RecognitionEvent>,
}

impl Acquired {
    async fn release(self) {
        self.recognition.cancel();
        self.capture.stop().await;
    }
}

/// Resources owned by the listening session
struct Resources {
    capture: Arc<AudioCaptureHandle>,
    recognition: Arc<RecognitionSession>,
    pump: JoinHandle<()>,
    results: JoinHandle<()>,
}

struct ActiveSession {
    token: Uuid,
    options: SessionOptions,
    started_at: DateTime<Utc>,
    pending: Option<StartReply>,
    resources: Option<Resources>,
    /// Whether `listeningState:"started"` went out for this session
    announced: bool,
}

/// Recognition session controller
///
/// All state lives in a single task that serializes caller requests,
/// permission outcomes, acquisition results and recognition callbacks.
/// Callbacks carry the session token, so anything belonging to a superseded
/// session is recognised and discarded.
#[derive(Clone)]
pub struct SessionController {
    tx: mpsc::UnboundedSender<Message>,
    engine: Arc<dyn RecognitionEngine>,
    permissions: Arc<dyn PermissionGate>,
}

impl SessionController {
    /// Create the controller and spawn its state task on the current runtime
    pub fn new(
        capture: AudioCapture,
        engine: Arc<dyn RecognitionEngine>,
        permissions: Arc<dyn PermissionGate>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let actor = Actor {
            state: SessionState::Idle,
            active: None,
            inbox: rx,
            tx: tx.downgrade(),
            acquiring: None,
            deferred: None,
            capture: Arc::new(capture),
            engine: Arc::clone(&engine),
            permissions: Arc::clone(&permissions),
            events,
            sessions_started: 0,
        };
        tokio::spawn(actor.run());

        Self {
            tx,
            engine,
            permissions,
        }
    }

    /// Whether a recognizer can be used for the default configuration
    pub fn available(&self) -> bool {
        self.engine.is_available()
    }

    /// Start listening
    ///
    /// In partial-results mode this resolves without payload once capture
    /// runs; otherwise it resolves with the final transcripts.
    pub async fn start(&self, options: SessionOptions) -> Result<StartResponse, SpeechError> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Start { options, reply })?;
        rx.await
            .unwrap_or_else(|_| Err(SpeechError::Unknown("session controller stopped".to_string())))
    }

    /// Stop listening; idempotent and never fails
    pub async fn stop(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(Message::Stop { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    /// Whether audio capture is currently running
    pub async fn is_listening(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.send(Message::IsListening { reply }).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Locales the recognizer advertises, without duplicates
    pub fn supported_languages(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.engine
            .supported_locales()
            .into_iter()
            .filter(|locale| seen.insert(locale.clone()))
            .collect()
    }

    /// Current speech recognition authorization
    pub fn check_permissions(&self) -> PermissionStatus {
        self.permissions.check_status(Capability::SpeechRecognition)
    }

    /// Prompt for speech recognition and then microphone access
    pub async fn request_permissions(&self) -> PermissionStatus {
        self.permissions.authorize_speech().await
    }

    pub async fn stats(&self) -> Result<SessionStats, SpeechError> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Stats { reply })?;
        rx.await
            .map_err(|_| SpeechError::Unknown("session controller stopped".to_string()))
    }

    fn send(&self, message: Message) -> Result<(), SpeechError> {
        self.tx
            .send(message)
            .map_err(|_| SpeechError::Unknown("session controller stopped".to_string()))
    }
}

struct Actor {
    state: SessionState,
    active: Option<ActiveSession>,
    inbox: mpsc::UnboundedReceiver<Message>,
    tx: mpsc::WeakUnboundedSender<Message>,
    /// Session whose acquisition task is still running, current or superseded
    acquiring: Option<Uuid>,
    /// Session waiting for a superseded acquisition to hand the device back
    deferred: Option<Uuid>,
    capture: Arc<AudioCapture>,
    engine: Arc<dyn RecognitionEngine>,
    permissions: Arc<dyn PermissionGate>,
    events: Arc<dyn EventSink>,
    sessions_started: usize,
}

impl Actor {
    async fn run(mut self) {
        debug!("Session controller task started");

        while let Some(message) = self.inbox.recv().await {
            match message {
                Message::Start { options, reply } => self.on_start(options, reply),
                Message::Stop { reply } => {
                    self.on_stop().await;
                    let _ = reply.send(());
                }
                Message::IsListening { reply } => {
                    let _ = reply.send(self.is_listening());
                }
                Message::Stats { reply } => {
                    let _ = reply.send(self.stats());
                }
                Message::MicrophoneDecision { token, status } => {
                    self.on_microphone_decision(token, status).await
                }
                Message::Acquired { token, outcome } => self.on_acquired(token, outcome).await,
                Message::Recognition { token, event } => self.on_recognition(token, event).await,
                Message::ResultsClosed { token } => {
                    if self.is_current(token) {
                        warn!("Recognition {} ended without a final result", token);
                        self.finish(Some(Err(SpeechError::Recognition(
                            "Recognition ended without a final result".to_string(),
                        ))))
                        .await;
                    }
                }
            }
        }

        // Every handle is gone; release whatever is still held
        self.finish(None).await;
        debug!("Session controller task stopped");
    }

    fn is_current(&self, token: Uuid) -> bool {
        self.active.as_ref().map(|a| a.token) == Some(token)
    }

    fn is_listening(&self) -> bool {
        self.active
            .as_ref()
            .and_then(|a| a.resources.as_ref())
            .map(|r| r.capture.is_running())
            .unwrap_or(false)
    }

    fn stats(&self) -> SessionStats {
        SessionStats {
            state: self.state,
            session_id: self.active.as_ref().map(|a| a.token),
            started_at: self.active.as_ref().map(|a| a.started_at),
            listening: self.is_listening(),
            sessions_started: self.sessions_started,
        }
    }

    fn spawn_with_sender<F, Fut>(&self, task: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(mpsc::UnboundedSender<Message>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let tx = self.tx.upgrade()?;
        Some(tokio::spawn(task(tx)))
    }

    fn on_start(&mut self, options: SessionOptions, reply: StartReply) {
        if self.state != SessionState::Idle || self.active.is_some() {
            info!("Rejecting start: session already active");
            let _ = reply.send(Err(SpeechError::Ongoing));
            return;
        }

        if !self
            .permissions
            .check_status(Capability::SpeechRecognition)
            .is_granted()
        {
            info!("Rejecting start: speech recognition not authorized");
            let _ = reply.send(Err(SpeechError::MissingPermission));
            return;
        }

        let token = Uuid::new_v4();
        info!(
            "Starting session {} (language={}, max_results={}, partial_results={})",
            token, options.language, options.max_results, options.partial_results
        );

        self.state = SessionState::Starting;
        self.active = Some(ActiveSession {
            token,
            options,
            started_at: Utc::now(),
            pending: Some(reply),
            resources: None,
            announced: false,
        });

        let permissions = Arc::clone(&self.permissions);
        let spawned = self.spawn_with_sender(move |tx| async move {
            let status = permissions.request_authorization(Capability::Microphone).await;
            let _ = tx.send(Message::MicrophoneDecision { token, status });
        });
        if spawned.is_none() {
            self.reset();
        }
    }

    async fn on_microphone_decision(&mut self, token: Uuid, status: PermissionStatus) {
        if !self.is_current(token) {
            debug!("Ignoring microphone decision for stale session {}", token);
            return;
        }

        if !status.is_granted() {
            info!("Microphone access denied for session {}", token);
            self.finish(Some(Err(SpeechError::AccessDeniedMicrophone))).await;
            return;
        }

        // Leftovers from an earlier session must be gone before acquiring again
        self.release_resources().await;

        if let Some(previous) = self.acquiring {
            info!(
                "Session {} waits for superseded session {} to release the device",
                token, previous
            );
            self.deferred = Some(token);
            return;
        }

        self.begin_acquire(token);
    }

    fn begin_acquire(&mut self, token: Uuid) {
        let Some(options) = self.active.as_ref().map(|a| a.options.clone()) else {
            return;
        };
        let capture = Arc::clone(&self.capture);
        let engine = Arc::clone(&self.engine);

        self.acquiring = Some(token);
        let spawned = self.spawn_with_sender(move |tx| async move {
            let outcome = acquire(&capture, engine.as_ref(), &options).await;
            if let Err(tx_err) = tx.send(Message::Acquired { token, outcome }) {
                // Controller is gone; release what was just acquired
                if let Message::Acquired {
                    outcome: Ok(acquired),
                    ..
                } = tx_err.0
                {
                    acquired.release().await;
                }
            }
        });
        if spawned.is_none() {
            self.acquiring = None;
            self.reset();
        }
    }

    async fn on_acquired(&mut self, token: Uuid, outcome: Result<Acquired, SpeechError>) {
        if self.acquiring == Some(token) {
            self.acquiring = None;
        }

        if !self.is_current(token) {
            if let Ok(acquired) = outcome {
                info!("Releasing resources of superseded session {}", token);
                acquired.release().await;
            }
            self.resume_deferred();
            return;
        }

        let acquired = match outcome {
            Ok(acquired) => acquired,
            Err(e) => {
                error!("Failed to start session {}: {}", token, e);
                self.finish(Some(Err(e))).await;
                return;
            }
        };

        let Acquired {
            capture,
            recognition,
            mut audio_rx,
            mut results_rx,
        } = acquired;
        let capture = Arc::new(capture);
        let recognition = Arc::new(recognition);

        // Audio context → recognition request, in capture order
        let pump = {
            let capture = Arc::clone(&capture);
            let recognition = Arc::clone(&recognition);
            tokio::spawn(async move {
                while let Some(buffer) = audio_rx.recv().await {
                    recognition.append(buffer);
                }
                debug!("Audio stream of session {} ended", token);
                capture.mark_ended();
                recognition.end_audio();
            })
        };

        // Recognition context → controller
        let results = self.spawn_with_sender(move |tx| async move {
            while let Some(event) = results_rx.recv().await {
                let terminal = event.is_terminal();
                if tx.send(Message::Recognition { token, event }).is_err() || terminal {
                    return;
                }
            }
            let _ = tx.send(Message::ResultsClosed { token });
        });
        let Some(results) = results else {
            pump.abort();
            recognition.cancel();
            capture.stop().await;
            self.reset();
            return;
        };

        self.state = SessionState::Listening;
        self.sessions_started += 1;

        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.resources = Some(Resources {
            capture,
            recognition,
            pump,
            results,
        });
        active.announced = true;

        info!("Session {} listening", token);
        self.events.emit(SpeechEvent::started());

        if active.options.partial_results {
            if let Some(reply) = active.pending.take() {
                let _ = reply.send(Ok(StartResponse { matches: None }));
            }
        }
    }

    /// Acquire for the session that waited on a superseded acquisition
    fn resume_deferred(&mut self) {
        let Some(token) = self.deferred.take() else {
            return;
        };
        if self.is_current(token) && self.state == SessionState::Starting {
            debug!("Device released; resuming session {}", token);
            self.begin_acquire(token);
        }
    }

    async fn on_recognition(&mut self, token: Uuid, event: RecognitionEvent) {
        if !self.is_current(token) {
            debug!("Ignoring recognition event for stale session {}", token);
            return;
        }
        let Some(options) = self.active.as_ref().map(|a| a.options.clone()) else {
            return;
        };

        match event {
            RecognitionEvent::Result(RecognitionResult {
                transcripts,
                is_final,
            }) => {
                let matches = truncate_matches(transcripts, options.max_results);

                if options.partial_results {
                    self.events.emit(SpeechEvent::PartialResults {
                        matches: matches.clone(),
                    });
                }

                if is_final {
                    info!("Final result for session {} ({} matches)", token, matches.len());
                    self.finish(Some(Ok(StartResponse {
                        matches: Some(matches),
                    })))
                    .await;
                }
            }
            RecognitionEvent::Error(RecognitionFailure::NoSpeech) => {
                info!("No speech detected in session {}", token);
                self.finish(Some(Ok(StartResponse::empty(&options)))).await;
            }
            RecognitionEvent::Error(RecognitionFailure::Fatal(message)) => {
                error!("Recognition failed in session {}: {}", token, message);
                self.finish(Some(Err(SpeechError::Recognition(message)))).await;
            }
        }
    }

    async fn on_stop(&mut self) {
        let Some(active) = self.active.as_ref() else {
            debug!("Stop requested while idle");
            return;
        };
        info!("Stopping session {}", active.token);
        let outcome = StartResponse::empty(&active.options);
        self.finish(Some(Ok(outcome))).await;
    }

    /// Tear down the active session
    ///
    /// Resolves a still-pending start with `outcome` (or its empty outcome),
    /// releases capture and recognition, and announces `stopped` if `started`
    /// was announced. Safe to call when nothing is active.
    async fn finish(&mut self, outcome: Option<Result<StartResponse, SpeechError>>) {
        let Some(mut active) = self.active.take() else {
            self.state = SessionState::Idle;
            return;
        };
        self.state = SessionState::Stopping;

        if let Some(reply) = active.pending.take() {
            let outcome = outcome.unwrap_or_else(|| Ok(StartResponse::empty(&active.options)));
            let _ = reply.send(outcome);
        }

        if let Some(resources) = active.resources.take() {
            Self::release(resources).await;
        }

        if active.announced {
            self.events.emit(SpeechEvent::stopped());
        }

        self.state = SessionState::Idle;
        info!("Session {} torn down", active.token);
    }

    async fn release_resources(&mut self) {
        let resources = self.active.as_mut().and_then(|a| a.resources.take());
        if let Some(resources) = resources {
            warn!("Releasing lingering session resources");
            Self::release(resources).await;
        }
    }

    async fn release(resources: Resources) {
        resources.recognition.cancel();
        resources.capture.stop().await;
        resources.pump.abort();
        resources.results.abort();
    }

    /// Drop the active session without announcing anything
    fn reset(&mut self) {
        self.active = None;
        self.state = SessionState::Idle;
    }
}

/// Open capture and recognition together, then start capture
///
/// On failure everything acquired so far is released before returning.
async fn acquire(
    capture: &AudioCapture,
    engine: &dyn RecognitionEngine,
    options: &SessionOptions,
) -> Result<Acquired, SpeechError> {
    let handle = capture.open().await?;

    let mut recognition = match engine
        .open_session(&options.language, options.partial_results)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            handle.stop().await;
            return Err(e);
        }
    };

    let Some(results_rx) = recognition.take_results() else {
        recognition.cancel();
        handle.stop().await;
        return Err(SpeechError::Unknown(
            "recognition results already consumed".to_string(),
        ));
    };

    let audio_rx = match handle.start().await {
        Ok(rx) => rx,
        Err(e) => {
            recognition.cancel();
            handle.stop().await;
            return Err(e);
        }
    };

    debug!(
        "Acquired {} recognizer for {} ({}Hz, {} channels)",
        engine.name(),
        recognition.locale(),
        handle.format().sample_rate,
        handle.format().channels
    );

    Ok(Acquired {
        capture: handle,
        recognition,
        audio_rx,
        results_rx,
    })
}
