use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Native format of the input device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

/// One buffer delivered by the input tap (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioBuffer {
    /// Number of frames (samples per channel) in this buffer
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// Configuration for audio backends
#[derive(Debug, Clone, Deserialize)]
pub struct AudioBackendConfig {
    /// Frames per tap buffer
    #[serde(default = "default_tap_frames")]
    pub tap_frames: usize,
    /// WAV file replayed by the file backend
    #[serde(default)]
    pub input_path: Option<PathBuf>,
    /// Restart the file from the beginning when it runs out
    #[serde(default)]
    pub loop_input: bool,
    /// Depth of the tap channel before buffers are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_tap_frames() -> usize {
    1024
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            tap_frames: default_tap_frames(),
            input_path: None,
            loop_input: false,
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Why a backend refused to configure its audio session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    /// Another process or session holds the input device
    DeviceBusy,
    /// Category, mode or activation call failed
    Configuration(String),
}

/// Audio capture backend trait
///
/// Platform-specific implementations own the audio engine and its input tap.
/// `AudioCapture` wraps a backend and adds the exclusivity and idempotence
/// guarantees, so backends may assume `start`/`stop` are called at most once.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Configure and activate the audio session for play-and-record with
    /// speaker routing, and report the native input format
    async fn configure_session(&mut self) -> std::result::Result<AudioFormat, SessionFailure>;

    /// Install the input tap and start the engine
    ///
    /// Returns a channel receiver that will receive audio buffers in capture order
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBuffer>>;

    /// Stop the engine and remove the tap
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Creates a fresh backend for every session
pub trait AudioBackendFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn AudioBackend>>;
}

impl<F> AudioBackendFactory for F
where
    F: Fn() -> Result<Box<dyn AudioBackend>> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn AudioBackend>> {
        self()
    }
}
