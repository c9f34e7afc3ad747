use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioBuffer, AudioFormat, SessionFailure};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            bail!("WAV file declares no channels or a zero sample rate");
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Split the file into tap-sized buffers with capture timestamps
    pub fn buffers(&self, tap_frames: usize) -> Vec<AudioBuffer> {
        let chunk_len = tap_frames.max(1) * self.channels as usize;

        self.samples
            .chunks(chunk_len)
            .enumerate()
            .map(|(i, chunk)| AudioBuffer {
                samples: chunk.to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: (i * tap_frames) as u64 * 1000 / self.sample_rate as u64,
            })
            .collect()
    }
}

/// Replays a WAV file as if it were the microphone
///
/// Buffers are delivered at real-time pace. A full tap channel drops the
/// buffer instead of stalling the clock.
pub struct FileBackend {
    config: AudioBackendConfig,
    path: PathBuf,
    audio: Option<Arc<AudioFile>>,
    task: Option<JoinHandle<()>>,
    capturing: Arc<AtomicBool>,
}

impl FileBackend {
    pub fn new(config: AudioBackendConfig) -> Result<Self> {
        let path = config
            .input_path
            .clone()
            .context("File backend requires audio.input_path")?;

        Ok(Self {
            config,
            path,
            audio: None,
            task: None,
            capturing: Arc::new(AtomicBool::new(false)),
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn configure_session(&mut self) -> std::result::Result<AudioFormat, SessionFailure> {
        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .map_err(|e| SessionFailure::Configuration(format!("Audio loader panicked: {}", e)))?
            .map_err(|e| SessionFailure::Configuration(format!("{:#}", e)))?;

        let format = audio.format();
        self.audio = Some(Arc::new(audio));
        Ok(format)
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBuffer>> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("Already capturing");
        }
        let audio = self
            .audio
            .clone()
            .context("Audio session not configured")?;

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let buffers = audio.buffers(self.config.tap_frames);
        let period = Duration::from_micros(
            self.config.tap_frames.max(1) as u64 * 1_000_000 / audio.sample_rate as u64,
        );
        let loop_input = self.config.loop_input;
        let capturing = Arc::clone(&self.capturing);
        let path = audio.path.clone();

        capturing.store(true, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            info!("Replaying {} ({} buffers every {:?})", path, buffers.len(), period);
            let mut ticker = tokio::time::interval(period);
            let mut offset_ms = 0u64;

            'replay: loop {
                for buffer in &buffers {
                    ticker.tick().await;

                    let mut buffer = buffer.clone();
                    buffer.timestamp_ms += offset_ms;

                    match tx.try_send(buffer) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            warn!("Tap consumer is behind, dropping buffer");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break 'replay,
                    }
                }

                if !loop_input {
                    break;
                }
                offset_ms += (audio.duration_seconds * 1000.0) as u64;
            }

            debug!("Replay of {} finished", path);
            capturing.store(false, Ordering::SeqCst);
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
