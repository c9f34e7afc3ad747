pub mod client;
pub mod engine;
pub mod messages;

pub use client::NatsClient;
pub use engine::NatsEngine;
pub use messages::{AudioFrameMessage, TranscriptMessage};
