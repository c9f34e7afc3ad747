use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioBackendFactory, AudioBuffer, AudioFormat, SessionFailure};
use crate::error::SpeechError;

/// Exclusive access to the input device
///
/// Only one `AudioCaptureHandle` may exist per `AudioCapture` at a time.
pub struct AudioCapture {
    factory: Arc<dyn AudioBackendFactory>,
    claimed: Arc<AtomicBool>,
}

impl AudioCapture {
    pub fn new(factory: impl AudioBackendFactory + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
            claimed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a handle currently holds the device
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    /// Claim the device and configure the audio session
    ///
    /// Fails with `AudioSession` if the device is already claimed or the
    /// backend cannot configure/activate its session.
    pub async fn open(&self) -> Result<AudioCaptureHandle, SpeechError> {
        if self.claimed.swap(true, Ordering::SeqCst) {
            warn!("Audio device already claimed");
            return Err(SpeechError::device_busy());
        }
        let claim = DeviceClaim(Arc::clone(&self.claimed));

        let mut backend = self
            .factory
            .create()
            .map_err(|e| SpeechError::AudioSession(format!("{:#}", e)))?;

        let format = backend.configure_session().await.map_err(|failure| match failure {
            SessionFailure::DeviceBusy => SpeechError::device_busy(),
            SessionFailure::Configuration(msg) => SpeechError::AudioSession(msg),
        })?;

        info!(
            "Audio session configured on {} ({}Hz, {} channels)",
            backend.name(),
            format.sample_rate,
            format.channels
        );

        Ok(AudioCaptureHandle {
            backend: tokio::sync::Mutex::new(backend),
            format,
            tap_installed: AtomicBool::new(false),
            running: AtomicBool::new(false),
            claim: Mutex::new(Some(claim)),
        })
    }
}

/// Releases the device claim when dropped
struct DeviceClaim(Arc<AtomicBool>);

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Ownership of a configured audio engine and its input tap
///
/// The tap is installed at most once and removed exactly once, no matter how
/// many callers race into `stop`.
pub struct AudioCaptureHandle {
    backend: tokio::sync::Mutex<Box<dyn AudioBackend>>,
    format: AudioFormat,
    tap_installed: AtomicBool,
    running: AtomicBool,
    claim: Mutex<Option<DeviceClaim>>,
}

impl AudioCaptureHandle {
    /// Native sample format of the input device
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Record that the tap stream ended on the backend's side
    ///
    /// The tap stays installed until `stop`, which still releases the device.
    pub fn mark_ended(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Audio input ended before stop was requested");
        }
    }

    /// Install the tap and start pulling from the input device
    ///
    /// Returns the FIFO stream of tap buffers. A failed start leaves the tap
    /// marked installed so that `stop` still cleans up after the backend.
    pub async fn start(&self) -> Result<mpsc::Receiver<AudioBuffer>, SpeechError> {
        if self.tap_installed.swap(true, Ordering::SeqCst) {
            return Err(SpeechError::EngineStart("input tap already installed".to_string()));
        }

        let mut backend = self.backend.lock().await;
        let rx = backend
            .start()
            .await
            .map_err(|e| SpeechError::EngineStart(format!("{:#}", e)))?;

        self.running.store(true, Ordering::SeqCst);
        info!("Audio capture started on {}", backend.name());
        Ok(rx)
    }

    /// Halt capture, remove the tap and release the device
    ///
    /// Idempotent: only the first caller reaches the backend.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        if self.tap_installed.swap(false, Ordering::SeqCst) {
            let mut backend = self.backend.lock().await;
            match backend.stop().await {
                Ok(()) => info!("Audio capture stopped on {}", backend.name()),
                Err(e) => warn!("Failed to stop audio backend {}: {:#}", backend.name(), e),
            }
        } else {
            debug!("Audio capture already stopped");
        }

        let claim = self
            .claim
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        drop(claim);
    }
}
