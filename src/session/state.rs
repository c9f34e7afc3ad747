use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Controller phase
///
/// Transitions run `Idle → Starting → Listening → Stopping → Idle`; failures
/// may jump from `Starting` or `Listening` straight into teardown, which
/// always ends in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Starting,
    Listening,
    Stopping,
}

/// Diagnostic snapshot of the controller
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Current phase
    pub state: SessionState,

    /// Token of the active session, if any
    pub session_id: Option<Uuid>,

    /// When the active session was started
    pub started_at: Option<DateTime<Utc>>,

    /// Whether audio capture is running
    pub listening: bool,

    /// Sessions that reached `Listening` since the controller was created
    pub sessions_started: usize,
}
