// Integration tests for the WAV-backed capture adapter
//
// Fixtures are generated into a temporary directory with hound.

use anyhow::Result;
use speech_session::audio::{AudioBackend, AudioBackendConfig, AudioCapture, AudioFile, FileBackend};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_wav(dir: &Path, name: &str, sample_rate: u32, channels: u16, frames: usize) -> Result<PathBuf> {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, spec)?;
    for i in 0..frames * channels as usize {
        writer.write_sample((i % 1000) as i16)?;
    }
    writer.finalize()?;

    Ok(path)
}

fn file_config(path: PathBuf, tap_frames: usize) -> AudioBackendConfig {
    AudioBackendConfig {
        tap_frames,
        input_path: Some(path),
        loop_input: false,
        channel_capacity: 256,
    }
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "mic.wav", 16000, 1, 8000)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 8000);
    assert!((audio.duration_seconds - 0.5).abs() < 0.001, "Duration should be 500ms");
    assert!(audio.path.contains("mic.wav"));

    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let path = PathBuf::from("/nonexistent/path/to/audio.wav");
    let result = AudioFile::open(&path);

    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[test]
fn test_audio_file_buffers_cover_all_samples() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "stereo.wav", 48000, 2, 2500)?;
    let audio = AudioFile::open(&path)?;

    let buffers = audio.buffers(1024);

    // 2500 frames in 1024-frame taps: 1024 + 1024 + 452
    assert_eq!(buffers.len(), 3);
    assert_eq!(buffers[0].frame_count(), 1024);
    assert_eq!(buffers[2].frame_count(), 452);
    assert_eq!(buffers.iter().map(|b| b.samples.len()).sum::<usize>(), audio.samples.len());

    // Timestamps advance by one tap each
    assert_eq!(buffers[0].timestamp_ms, 0);
    assert_eq!(buffers[1].timestamp_ms, 1024 * 1000 / 48000);

    Ok(())
}

#[test]
fn test_file_backend_requires_input_path() {
    assert!(FileBackend::new(AudioBackendConfig::default()).is_err());
}

#[tokio::test]
async fn test_file_backend_replays_in_order() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "mic.wav", 16000, 1, 1600)?;

    let mut backend = FileBackend::new(file_config(path, 160))?;
    let format = backend.configure_session().await.expect("session configured");
    assert_eq!(format.sample_rate, 16000);

    let mut rx = backend.start().await?;
    assert!(backend.is_capturing());

    let mut timestamps = Vec::new();
    while let Some(buffer) = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await? {
        timestamps.push(buffer.timestamp_ms);
    }

    assert_eq!(timestamps, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90]);
    backend.stop().await?;
    assert!(!backend.is_capturing());

    Ok(())
}

#[tokio::test]
async fn test_file_backend_missing_file_fails_configuration() -> Result<()> {
    let capture_path = PathBuf::from("/nonexistent/mic.wav");
    let config = file_config(capture_path, 1024);
    let capture = AudioCapture::new(move || -> Result<Box<dyn AudioBackend>> {
        Ok(Box::new(FileBackend::new(config.clone())?))
    });

    let outcome = capture.open().await;

    assert!(matches!(
        outcome.err(),
        Some(speech_session::SpeechError::AudioSession(_))
    ));
    Ok(())
}
