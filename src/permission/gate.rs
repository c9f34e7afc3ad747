use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability guarded by an OS-level authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    SpeechRecognition,
    Microphone,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpeechRecognition => write!(f, "speech recognition"),
            Self::Microphone => write!(f, "microphone"),
        }
    }
}

/// Authorization state as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Prompt,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// Source of authorization decisions
///
/// `request_authorization` suspends until the user answers a prompt (or the
/// platform resolves immediately) and never fails: every outcome is a status.
#[async_trait::async_trait]
pub trait PermissionGate: Send + Sync {
    /// Current authorization, without prompting
    fn check_status(&self, capability: Capability) -> PermissionStatus;

    /// Prompt for a single capability if the user has not decided yet
    async fn request_authorization(&self, capability: Capability) -> PermissionStatus;

    /// Composite request backing `requestPermissions()`
    ///
    /// Speech recognition is requested first. The microphone is only asked
    /// for once speech was granted, and its answer becomes the result.
    /// Otherwise the current speech status is reported unchanged.
    async fn authorize_speech(&self) -> PermissionStatus {
        match self.request_authorization(Capability::SpeechRecognition).await {
            PermissionStatus::Granted => {
                match self.request_authorization(Capability::Microphone).await {
                    PermissionStatus::Granted => PermissionStatus::Granted,
                    _ => PermissionStatus::Denied,
                }
            }
            _ => self.check_status(Capability::SpeechRecognition),
        }
    }
}
