use crate::session::{BroadcastSink, SessionController, SessionOptions};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single recognition session controller
    pub controller: SessionController,

    /// Event fan-out feeding `/speech/events`
    pub events: BroadcastSink,

    /// Defaults for options a caller leaves out of `start`
    pub defaults: SessionOptions,
}

impl AppState {
    pub fn new(controller: SessionController, events: BroadcastSink, defaults: SessionOptions) -> Self {
        Self {
            controller,
            events,
            defaults,
        }
    }
}
