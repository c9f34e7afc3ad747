//! HTTP call surface for embedding applications
//!
//! - POST /speech/start - Start listening (`{language?, maxResults?, partialResults?}`)
//! - POST /speech/stop - Stop listening
//! - GET /speech/available - Recognizer availability
//! - GET /speech/listening - Whether capture is running
//! - GET /speech/languages - Supported locales
//! - GET|POST /speech/permissions - Check or request authorization
//! - GET /speech/events - `listeningState` / `partialResults` as server-sent events
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
