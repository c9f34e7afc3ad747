use async_nats::Subscriber;
use futures::stream::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::client::NatsClient;
use super::messages::TranscriptMessage;
use crate::audio::convert::convert_buffer;
use crate::audio::AudioBuffer;
use crate::error::SpeechError;
use crate::recognition::{
    EngineSide, RecognitionEngine, RecognitionEvent, RecognitionFailure, RecognitionResult,
    RecognitionSession,
};

/// Sample rate the STT service expects
const TARGET_SAMPLE_RATE: u32 = 16000;

/// Recognition engine backed by a remote STT service over NATS
///
/// Audio is published as 16 kHz mono PCM frames to `audio.frame.<session>`;
/// transcripts arrive on `stt.text.>` and are matched by session id.
pub struct NatsEngine {
    client: Arc<NatsClient>,
    locales: Vec<String>,
}

impl NatsEngine {
    pub fn new(client: Arc<NatsClient>, locales: Vec<String>) -> Self {
        Self { client, locales }
    }

    fn supports(&self, locale: &str) -> bool {
        self.locales.is_empty() || self.locales.iter().any(|l| l.eq_ignore_ascii_case(locale))
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for NatsEngine {
    fn is_available(&self) -> bool {
        self.client.is_connected()
    }

    fn supported_locales(&self) -> Vec<String> {
        self.locales.clone()
    }

    async fn open_session(
        &self,
        locale: &str,
        report_partial: bool,
    ) -> Result<RecognitionSession, SpeechError> {
        if !self.supports(locale) {
            return Err(SpeechError::Recognition(format!(
                "No speech recognizer available for locale {}",
                locale
            )));
        }
        if !self.is_available() {
            return Err(SpeechError::Recognition(
                "Speech recognition service is unavailable".to_string(),
            ));
        }

        let subscriber = self
            .client
            .subscribe_transcripts()
            .await
            .map_err(|e| SpeechError::Recognition(format!("{:#}", e)))?;

        let session_id = uuid::Uuid::new_v4().to_string();
        let (session, engine) = RecognitionSession::pair(locale, report_partial);

        info!("Opened NATS recognition session {} ({})", session_id, locale);
        tokio::spawn(drive(Arc::clone(&self.client), subscriber, engine, session_id));

        Ok(session)
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Map a transcript message to a recognition event
///
/// Returns `None` for partial transcripts the session did not ask for.
pub fn interpret(message: &TranscriptMessage, report_partial: bool) -> Option<RecognitionEvent> {
    if let Some(code) = &message.error {
        let failure = if code == TranscriptMessage::NO_SPEECH {
            RecognitionFailure::NoSpeech
        } else {
            RecognitionFailure::Fatal(code.clone())
        };
        return Some(RecognitionEvent::Error(failure));
    }

    if message.partial && !report_partial {
        return None;
    }

    Some(RecognitionEvent::Result(RecognitionResult {
        transcripts: message.transcripts(),
        is_final: !message.partial,
    }))
}

enum Step {
    Audio(Option<AudioBuffer>),
    Transcript(Option<async_nats::Message>),
    Cancelled,
}

async fn drive(
    client: Arc<NatsClient>,
    mut subscriber: Subscriber,
    mut engine: EngineSide,
    session_id: String,
) {
    let language = engine.locale().to_string();
    let mut sequence = 0u32;
    let mut audio_open = true;

    loop {
        let step = if audio_open {
            tokio::select! {
                buffer = engine.next_audio() => Step::Audio(buffer),
                message = subscriber.next() => Step::Transcript(message),
            }
        } else {
            tokio::select! {
                _ = engine.cancelled() => Step::Cancelled,
                message = subscriber.next() => Step::Transcript(message),
            }
        };

        match step {
            Step::Audio(Some(buffer)) => {
                let buffer = convert_buffer(buffer, TARGET_SAMPLE_RATE, 1);
                if let Err(e) = client
                    .publish_audio_frame(&session_id, &language, &buffer, sequence, false)
                    .await
                {
                    error!("Failed to publish audio frame: {:#}", e);
                }
                sequence += 1;
            }
            Step::Audio(None) => {
                audio_open = false;
                if engine.is_cancelled() {
                    break;
                }

                // Final frame marker asks the service for its last pass
                let marker = AudioBuffer {
                    samples: Vec::new(),
                    sample_rate: TARGET_SAMPLE_RATE,
                    channels: 1,
                    timestamp_ms: 0,
                };
                if let Err(e) = client
                    .publish_audio_frame(&session_id, &language, &marker, sequence, true)
                    .await
                {
                    error!("Failed to publish final frame marker: {:#}", e);
                }
            }
            Step::Transcript(Some(message)) => {
                let transcript = match serde_json::from_slice::<TranscriptMessage>(&message.payload) {
                    Ok(transcript) => transcript,
                    Err(e) => {
                        warn!("Failed to parse transcript message: {}", e);
                        continue;
                    }
                };
                if transcript.session_id != session_id {
                    continue;
                }

                if let Some(event) = interpret(&transcript, engine.report_partial()) {
                    let terminal = event.is_terminal();
                    engine.emit(event);
                    if terminal {
                        break;
                    }
                }
            }
            Step::Transcript(None) => {
                engine.emit(RecognitionEvent::Error(RecognitionFailure::Fatal(
                    "Transcript subscription closed".to_string(),
                )));
                break;
            }
            Step::Cancelled => break,
        }
    }

    if let Err(e) = subscriber.unsubscribe().await {
        debug!("Failed to unsubscribe session {}: {}", session_id, e);
    }
    debug!("NATS recognition session {} finished", session_id);
}
