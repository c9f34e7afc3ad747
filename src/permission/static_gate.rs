use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

use super::gate::{Capability, PermissionGate, PermissionStatus};

/// Initial authorization state for the headless gate
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsConfig {
    /// Speech recognition status at process start
    pub speech_recognition: PermissionStatus,

    /// Microphone status at process start
    pub microphone: PermissionStatus,

    /// Answer given to a prompt for an undecided capability
    #[serde(default = "default_grant_on_prompt")]
    pub grant_on_prompt: bool,
}

fn default_grant_on_prompt() -> bool {
    true
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            speech_recognition: PermissionStatus::Prompt,
            microphone: PermissionStatus::Prompt,
            grant_on_prompt: true,
        }
    }
}

/// Permission gate for deployments without an interactive OS prompt
///
/// Each capability is prompted at most once per process; the answer is
/// remembered and returned for every later request.
pub struct StaticPermissionGate {
    statuses: Mutex<HashMap<Capability, PermissionStatus>>,
    grant_on_prompt: bool,
}

impl StaticPermissionGate {
    pub fn new(config: &PermissionsConfig) -> Self {
        let mut statuses = HashMap::new();
        statuses.insert(Capability::SpeechRecognition, config.speech_recognition);
        statuses.insert(Capability::Microphone, config.microphone);

        Self {
            statuses: Mutex::new(statuses),
            grant_on_prompt: config.grant_on_prompt,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Capability, PermissionStatus>> {
        // A poisoned map still holds valid statuses
        self.statuses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl PermissionGate for StaticPermissionGate {
    fn check_status(&self, capability: Capability) -> PermissionStatus {
        self.lock()
            .get(&capability)
            .copied()
            .unwrap_or(PermissionStatus::Prompt)
    }

    async fn request_authorization(&self, capability: Capability) -> PermissionStatus {
        let mut statuses = self.lock();
        let status = statuses.entry(capability).or_insert(PermissionStatus::Prompt);

        if *status == PermissionStatus::Prompt {
            *status = if self.grant_on_prompt {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            };
            info!("Resolved {} prompt: {:?}", capability, status);
        }

        *status
    }
}
