use serde::{Deserialize, Serialize};

/// Audio frame message published to NATS
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub language: String,
    pub timestamp: String, // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Transcript message received from the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    #[serde(default)]
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Ranked alternatives after `text`, best-first
    #[serde(default)]
    pub alternatives: Vec<String>,
    /// Error code reported instead of a transcript
    #[serde(default)]
    pub error: Option<String>,
}

impl TranscriptMessage {
    /// Error code the STT service uses when nothing was said
    pub const NO_SPEECH: &'static str = "no_speech";

    /// Transcript list, best-first, without empty or repeated entries
    pub fn transcripts(&self) -> Vec<String> {
        let mut transcripts: Vec<String> = Vec::with_capacity(1 + self.alternatives.len());
        for text in std::iter::once(&self.text).chain(self.alternatives.iter()) {
            if !text.is_empty() && !transcripts.contains(text) {
                transcripts.push(text.clone());
            }
        }
        transcripts
    }
}
