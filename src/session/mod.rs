//! Recognition session management
//!
//! This module provides the `SessionController` that arbitrates start/stop
//! requests, wires audio capture into a recognition session, maps engine
//! output to results and events, and tears everything down exactly once.

mod controller;
mod events;
mod options;
mod state;

pub use controller::{SessionController, StartResponse};
pub use events::{BroadcastSink, EventSink, ListeningStatus, SpeechEvent};
pub use options::{truncate_matches, SessionOptions, StartRequest};
pub use state::{SessionState, SessionStats};
