use thiserror::Error;

/// Rejection reasons surfaced to callers of the speech session API
///
/// Permission and concurrency errors are raised before any resource is
/// touched; the remaining variants are raised after a teardown of whatever
/// was partially acquired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    /// A session is already active
    #[error("Ongoing speech recognition")]
    Ongoing,

    /// Speech recognition has not been authorized yet
    #[error("Missing permission")]
    MissingPermission,

    /// The user declined microphone access during this start attempt
    #[error("User denied access to microphone")]
    AccessDeniedMicrophone,

    /// Audio session category/mode/activation failed (including device busy)
    #[error("{0}")]
    AudioSession(String),

    /// The audio engine could not start after configuration succeeded
    #[error("Audio engine failed to start: {0}")]
    EngineStart(String),

    /// Fatal failure reported by the recognition engine
    #[error("{0}")]
    Recognition(String),

    /// Unclassified native failure
    #[error("Unknown error occured: {0}")]
    Unknown(String),
}

impl SpeechError {
    /// Message used when the input device is held by someone else
    pub const DEVICE_BUSY: &'static str = "Microphone is already in use by another application.";

    pub fn device_busy() -> Self {
        Self::AudioSession(Self::DEVICE_BUSY.to_string())
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::MissingPermission => "missing_permission",
            Self::AccessDeniedMicrophone => "access_denied_microphone",
            Self::AudioSession(_) => "audio_session",
            Self::EngineStart(_) => "engine_start",
            Self::Recognition(_) => "recognition",
            Self::Unknown(_) => "unknown",
        }
    }
}
