pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod permission;
pub mod recognition;
pub mod session;

pub use audio::{AudioBackend, AudioBackendConfig, AudioBuffer, AudioCapture, AudioFile, FileBackend};
pub use config::Config;
pub use error::SpeechError;
pub use http::{create_router, AppState};
pub use nats::{NatsClient, NatsEngine, TranscriptMessage};
pub use permission::{Capability, PermissionGate, PermissionStatus, StaticPermissionGate};
pub use recognition::{RecognitionEngine, RecognitionEvent, RecognitionResult, RecognitionSession};
pub use session::{
    BroadcastSink, EventSink, SessionController, SessionOptions, SpeechEvent, StartResponse,
};
