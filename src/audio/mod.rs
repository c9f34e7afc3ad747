pub mod backend;
pub mod capture;
pub mod convert;
pub mod file;

pub use backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioBuffer, AudioFormat,
    SessionFailure,
};
pub use capture::{AudioCapture, AudioCaptureHandle};
pub use file::{AudioFile, FileBackend};
