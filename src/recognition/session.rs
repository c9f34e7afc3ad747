use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::engine::RecognitionEvent;
use crate::audio::AudioBuffer;

enum AudioInput {
    Buffer(AudioBuffer),
    End,
}

struct Flags {
    ended: AtomicBool,
    finished: AtomicBool,
}

/// Caller side of one recognition request/task pair
///
/// `append` never blocks, so it is safe to call from the audio context.
/// Dropping the session cancels it.
pub struct RecognitionSession {
    locale: String,
    audio_tx: mpsc::UnboundedSender<AudioInput>,
    results: Option<mpsc::UnboundedReceiver<RecognitionEvent>>,
    cancel_tx: watch::Sender<bool>,
    flags: Arc<Flags>,
}

/// Engine side of a recognition session
///
/// Adapters pull audio with `next_audio` and push results with `emit`.
/// Emissions after a cancel or after a terminal event are discarded.
pub struct EngineSide {
    locale: String,
    report_partial: bool,
    audio_rx: mpsc::UnboundedReceiver<AudioInput>,
    results_tx: mpsc::UnboundedSender<RecognitionEvent>,
    cancel_rx: watch::Receiver<bool>,
    flags: Arc<Flags>,
}

impl RecognitionSession {
    /// Create a connected caller/engine pair
    pub fn pair(locale: impl Into<String>, report_partial: bool) -> (Self, EngineSide) {
        let locale = locale.into();
        let (audio_tx, audio_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let flags = Arc::new(Flags {
            ended: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        });

        let session = Self {
            locale: locale.clone(),
            audio_tx,
            results: Some(results_rx),
            cancel_tx,
            flags: Arc::clone(&flags),
        };
        let engine = EngineSide {
            locale,
            report_partial,
            audio_rx,
            results_tx,
            cancel_rx,
            flags,
        };

        (session, engine)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Feed one audio buffer into the request
    pub fn append(&self, buffer: AudioBuffer) {
        if self.flags.ended.load(Ordering::SeqCst) || self.is_cancelled() {
            return;
        }
        let _ = self.audio_tx.send(AudioInput::Buffer(buffer));
    }

    /// Signal that no more audio follows; the engine may finish a final pass
    pub fn end_audio(&self) {
        if !self.flags.ended.swap(true, Ordering::SeqCst) {
            let _ = self.audio_tx.send(AudioInput::End);
        }
    }

    /// Abort the task; no further results are delivered
    ///
    /// Idempotent and safe after the session has completed.
    pub fn cancel(&self) {
        if !self.cancel_tx.send_replace(true) {
            debug!("Cancelling recognition session ({})", self.locale);
        }
        self.end_audio();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// The result stream; available exactly once
    pub fn take_results(&mut self) -> Option<mpsc::UnboundedReceiver<RecognitionEvent>> {
        self.results.take()
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl EngineSide {
    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn report_partial(&self) -> bool {
        self.report_partial
    }

    /// Next appended buffer, or `None` once audio ended or the task was cancelled
    pub async fn next_audio(&mut self) -> Option<AudioBuffer> {
        if self.is_cancelled() {
            return None;
        }
        match self.audio_rx.recv().await {
            Some(AudioInput::Buffer(buffer)) if !self.is_cancelled() => Some(buffer),
            _ => None,
        }
    }

    /// Deliver an event to the caller
    ///
    /// Returns false when the event was discarded.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        if self.is_cancelled() || self.flags.finished.load(Ordering::SeqCst) {
            return false;
        }
        if event.is_terminal() {
            self.flags.finished.store(true, Ordering::SeqCst);
        }
        self.results_tx.send(event).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Resolves once the caller cancels the session
    pub async fn cancelled(&mut self) {
        // A dropped sender also counts as cancellation
        let _ = self.cancel_rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Whether the caller signalled end of audio
    pub fn audio_ended(&self) -> bool {
        self.flags.ended.load(Ordering::SeqCst)
    }
}
