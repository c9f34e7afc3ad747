use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use base64::Engine;
use tracing::{debug, info};

use super::messages::AudioFrameMessage;
use crate::audio::convert::to_pcm_bytes;
use crate::audio::AudioBuffer;

pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.client.connection_state(),
            async_nats::connection::State::Connected
        )
    }

    /// Publish one audio buffer (or the final-frame marker) for a session
    pub async fn publish_audio_frame(
        &self,
        session_id: &str,
        language: &str,
        buffer: &AudioBuffer,
        sequence: u32,
        is_final: bool,
    ) -> Result<()> {
        let subject = format!("audio.frame.{}", session_id);
        let pcm_bytes = to_pcm_bytes(&buffer.samples);

        let message = AudioFrameMessage {
            session_id: session_id.to_string(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(&pcm_bytes),
            sample_rate: buffer.sample_rate,
            channels: buffer.channels,
            language: language.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: is_final,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish audio frame")?;

        debug!(
            "Published audio frame to {} (sequence={}, bytes={}, final={})",
            subject,
            sequence,
            pcm_bytes.len(),
            is_final
        );

        Ok(())
    }

    /// Subscribe to transcript messages
    pub async fn subscribe_transcripts(&self) -> Result<Subscriber> {
        // The STT service publishes to stt.text.partial and stt.text.final;
        // messages are filtered by session_id in the payload
        let subject = "stt.text.>".to_string();

        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to transcripts")?;

        debug!("Subscribed to {}", subject);

        Ok(subscriber)
    }
}
