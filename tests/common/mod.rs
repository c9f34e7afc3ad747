// Shared fakes for controller, capture and HTTP tests
//
// The capture backend, engine and permission gate stand in for platform
// adapters; tests drive them by hand to simulate each actor's timing.

#![allow(dead_code)]

use anyhow::{bail, Result};
use speech_session::audio::{AudioBackend, AudioBuffer, AudioCapture, AudioFormat, SessionFailure};
use speech_session::permission::{Capability, PermissionGate, PermissionStatus};
use speech_session::recognition::{EngineSide, RecognitionEngine, RecognitionSession};
use speech_session::session::{EventSink, SessionController, SpeechEvent};
use speech_session::SpeechError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(2);

/// Poll `condition` until it holds or the wait budget runs out
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Poll an async condition until it holds or the wait budget runs out
pub async fn eventually_async<F, Fut>(condition: F) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition().await
}

pub fn buffer(seq: i16) -> AudioBuffer {
    AudioBuffer {
        samples: vec![seq; 4],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: seq as u64 * 64,
    }
}

pub fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Capture backend
// ============================================================================

/// Observes and steers every `MockBackend` created by one factory
#[derive(Default)]
pub struct BackendProbe {
    pub created: AtomicUsize,
    pub configured: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub fail_configure: Mutex<Option<SessionFailure>>,
    pub fail_start: AtomicBool,
    tap: Mutex<Option<mpsc::Sender<AudioBuffer>>>,
}

impl BackendProbe {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Deliver a buffer through the installed tap
    pub fn push(&self, buffer: AudioBuffer) -> bool {
        let tap = self.tap.lock().unwrap();
        match tap.as_ref() {
            Some(tx) => tx.try_send(buffer).is_ok(),
            None => false,
        }
    }

    pub fn tap_open(&self) -> bool {
        self.tap.lock().unwrap().is_some()
    }

    /// Simulate the input device going away
    pub fn close_tap(&self) {
        self.tap.lock().unwrap().take();
    }
}

pub struct MockBackend {
    probe: Arc<BackendProbe>,
    capturing: bool,
}

#[async_trait::async_trait]
impl AudioBackend for MockBackend {
    async fn configure_session(&mut self) -> std::result::Result<AudioFormat, SessionFailure> {
        self.probe.configured.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.probe.fail_configure.lock().unwrap().clone() {
            return Err(failure);
        }
        Ok(AudioFormat {
            sample_rate: 48000,
            channels: 1,
        })
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBuffer>> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail_start.load(Ordering::SeqCst) {
            bail!("input device revoked");
        }
        let (tx, rx) = mpsc::channel(64);
        *self.probe.tap.lock().unwrap() = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        self.probe.tap.lock().unwrap().take();
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn mock_capture() -> (AudioCapture, Arc<BackendProbe>) {
    let probe = Arc::new(BackendProbe::default());
    let factory_probe = Arc::clone(&probe);
    let capture = AudioCapture::new(move || -> Result<Box<dyn AudioBackend>> {
        factory_probe.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockBackend {
            probe: Arc::clone(&factory_probe),
            capturing: false,
        }))
    });
    (capture, probe)
}

// ============================================================================
// Recognition engine
// ============================================================================

/// Engine whose sessions are driven by the test through `EngineSide`
pub struct ScriptedEngine {
    pub available: AtomicBool,
    pub locales: Vec<String>,
    pub opened: AtomicUsize,
    pub open_error: Mutex<Option<SpeechError>>,
    /// Delay applied to the next `open_session` only
    pub open_delay: Mutex<Duration>,
    sides: mpsc::UnboundedSender<EngineSide>,
}

impl ScriptedEngine {
    pub fn new(locales: Vec<String>) -> (Self, mpsc::UnboundedReceiver<EngineSide>) {
        let (sides, rx) = mpsc::unbounded_channel();
        let engine = Self {
            available: AtomicBool::new(true),
            locales,
            opened: AtomicUsize::new(0),
            open_error: Mutex::new(None),
            open_delay: Mutex::new(Duration::ZERO),
            sides,
        };
        (engine, rx)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for ScriptedEngine {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn supported_locales(&self) -> Vec<String> {
        self.locales.clone()
    }

    async fn open_session(
        &self,
        locale: &str,
        report_partial: bool,
    ) -> std::result::Result<RecognitionSession, SpeechError> {
        if let Some(error) = self.open_error.lock().unwrap().clone() {
            return Err(error);
        }
        let delay = std::mem::take(&mut *self.open_delay.lock().unwrap());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let (session, side) = RecognitionSession::pair(locale, report_partial);
        let _ = self.sides.send(side);
        Ok(session)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Permission gate
// ============================================================================

/// Gate with fixed answers that counts prompts
pub struct ScriptedGate {
    pub speech: Mutex<PermissionStatus>,
    pub microphone_answer: Mutex<PermissionStatus>,
    pub microphone_requests: AtomicUsize,
    /// Delay before answering the microphone prompt
    pub prompt_delay: Mutex<Duration>,
}

impl ScriptedGate {
    pub fn new(speech: PermissionStatus, microphone_answer: PermissionStatus) -> Self {
        Self {
            speech: Mutex::new(speech),
            microphone_answer: Mutex::new(microphone_answer),
            microphone_requests: AtomicUsize::new(0),
            prompt_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn microphone_requests(&self) -> usize {
        self.microphone_requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PermissionGate for ScriptedGate {
    fn check_status(&self, capability: Capability) -> PermissionStatus {
        match capability {
            Capability::SpeechRecognition => *self.speech.lock().unwrap(),
            Capability::Microphone => *self.microphone_answer.lock().unwrap(),
        }
    }

    async fn request_authorization(&self, capability: Capability) -> PermissionStatus {
        if capability == Capability::SpeechRecognition {
            let status = *self.speech.lock().unwrap();
            return status;
        }

        self.microphone_requests.fetch_add(1, Ordering::SeqCst);
        let delay = *self.prompt_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let answer = *self.microphone_answer.lock().unwrap();
        answer
    }
}

// ============================================================================
// Event sink
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SpeechEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SpeechEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &SpeechEvent) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn partials(&self) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SpeechEvent::PartialResults { matches } => Some(matches),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SpeechEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub controller: SessionController,
    pub probe: Arc<BackendProbe>,
    pub engine: Arc<ScriptedEngine>,
    pub gate: Arc<ScriptedGate>,
    pub sink: Arc<RecordingSink>,
    sides: mpsc::UnboundedReceiver<EngineSide>,
}

impl Harness {
    /// Controller with speech and microphone access granted
    pub fn new() -> Self {
        Self::with_gate(ScriptedGate::new(
            PermissionStatus::Granted,
            PermissionStatus::Granted,
        ))
    }

    pub fn with_gate(gate: ScriptedGate) -> Self {
        Self::with_locales(gate, words(&["en-US", "fr-FR"]))
    }

    pub fn with_locales(gate: ScriptedGate, locales: Vec<String>) -> Self {
        let (capture, probe) = mock_capture();
        let (engine, sides) = ScriptedEngine::new(locales);
        let engine = Arc::new(engine);
        let gate = Arc::new(gate);
        let sink = Arc::new(RecordingSink::default());

        let controller = SessionController::new(
            capture,
            engine.clone(),
            gate.clone(),
            sink.clone(),
        );

        Self {
            controller,
            probe,
            engine,
            gate,
            sink,
            sides,
        }
    }

    /// Engine side of the next opened recognition session
    pub async fn next_side(&mut self) -> EngineSide {
        tokio::time::timeout(WAIT, self.sides.recv())
            .await
            .expect("recognition session was not opened in time")
            .expect("engine dropped")
    }

    /// Wait until `listeningState:"started"` has been emitted `n` times
    pub async fn wait_started(&self, n: usize) {
        let sink = self.sink.clone();
        assert!(
            eventually(move || sink.count(&SpeechEvent::started()) >= n).await,
            "session did not start"
        );
    }

    pub async fn wait_stopped(&self, n: usize) {
        let sink = self.sink.clone();
        assert!(
            eventually(move || sink.count(&SpeechEvent::stopped()) >= n).await,
            "session did not stop"
        );
    }
}
