//! Recognition engine abstraction
//!
//! An engine binds a recognizer to a locale and hands out one
//! `RecognitionSession` per listening session. Audio flows in through
//! `append`, results flow out through the stream returned by `take_results`.

mod engine;
mod session;

pub use engine::{RecognitionEngine, RecognitionEvent, RecognitionFailure, RecognitionResult};
pub use session::{EngineSide, RecognitionSession};
