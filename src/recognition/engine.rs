use crate::error::SpeechError;

use super::session::RecognitionSession;

/// One engine callback payload
///
/// Each result supersedes the previous one and carries the full transcript
/// list, best-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcripts: Vec<String>,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn partial(transcripts: Vec<String>) -> Self {
        Self {
            transcripts,
            is_final: false,
        }
    }

    pub fn final_result(transcripts: Vec<String>) -> Self {
        Self {
            transcripts,
            is_final: true,
        }
    }
}

/// Terminal error reported by an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionFailure {
    /// Nothing was said; benign, reported as an empty result
    NoSpeech,
    /// Engine failure that must reach the caller
    Fatal(String),
}

/// Item of a session's result stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Result(RecognitionResult),
    Error(RecognitionFailure),
}

impl RecognitionEvent {
    /// Whether this event closes the stream
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Result(result) => result.is_final,
            Self::Error(_) => true,
        }
    }
}

/// Platform speech recognizer
#[async_trait::async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Whether a recognizer for the default configuration can be used right now
    fn is_available(&self) -> bool;

    /// Locale identifiers the recognizer advertises (may contain duplicates)
    fn supported_locales(&self) -> Vec<String>;

    /// Open a recognition session for `locale`
    ///
    /// Fails with `SpeechError::Recognition` if no recognizer exists for the
    /// locale or the service is unavailable.
    async fn open_session(
        &self,
        locale: &str,
        report_partial: bool,
    ) -> Result<RecognitionSession, SpeechError>;

    /// Get engine name for logging
    fn name(&self) -> &str;
}
