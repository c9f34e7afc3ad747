use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListeningStatus {
    Started,
    Stopped,
}

/// Push notification for the embedding application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum SpeechEvent {
    #[serde(rename = "listeningState")]
    ListeningState { status: ListeningStatus },
    #[serde(rename = "partialResults")]
    PartialResults { matches: Vec<String> },
}

impl SpeechEvent {
    pub fn started() -> Self {
        Self::ListeningState {
            status: ListeningStatus::Started,
        }
    }

    pub fn stopped() -> Self {
        Self::ListeningState {
            status: ListeningStatus::Stopped,
        }
    }

    /// Event name on the listener channel
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListeningState { .. } => "listeningState",
            Self::PartialResults { .. } => "partialResults",
        }
    }

    /// Event body as delivered to listeners
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::ListeningState { status } => json!({ "status": status }),
            Self::PartialResults { matches } => json!({ "matches": matches }),
        }
    }
}

/// Listener registry of the embedding application
///
/// `emit` is called from the controller's context and must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SpeechEvent);
}

/// Fans events out to any number of subscribers
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<SpeechEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: SpeechEvent) {
        // No subscribers is not an error
        if self.tx.send(event).is_err() {
            debug!("No event listeners registered");
        }
    }
}
