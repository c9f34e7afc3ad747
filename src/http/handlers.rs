use super::state::AppState;
use crate::error::SpeechError;
use crate::permission::PermissionStatus;
use crate::session::StartRequest;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::stream::{self, Stream};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub speech_recognition: PermissionStatus,
}

fn error_response(error: SpeechError) -> Response {
    let status = match error {
        SpeechError::Ongoing => StatusCode::CONFLICT,
        SpeechError::MissingPermission | SpeechError::AccessDeniedMicrophone => {
            StatusCode::FORBIDDEN
        }
        SpeechError::AudioSession(_) | SpeechError::EngineStart(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SpeechError::Recognition(_) | SpeechError::Unknown(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            code: error.code(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /speech/available
pub async fn available(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "available": state.controller.available() }))
}

/// POST /speech/start
/// Resolves with `{}` in partial-results mode, `{matches}` otherwise
pub async fn start(State(state): State<AppState>, Json(req): Json<StartRequest>) -> Response {
    let options = req.resolve(&state.defaults);
    info!("Start requested (language={})", options.language);

    match state.controller.start(options).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            warn!("Start rejected: {}", e);
            error_response(e)
        }
    }
}

/// POST /speech/stop
pub async fn stop(State(state): State<AppState>) -> impl IntoResponse {
    state.controller.stop().await;
    Json(json!({}))
}

/// GET /speech/listening
pub async fn is_listening(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "listening": state.controller.is_listening().await }))
}

/// GET /speech/languages
pub async fn supported_languages(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "languages": state.controller.supported_languages() }))
}

/// GET /speech/permissions
pub async fn check_permissions(State(state): State<AppState>) -> impl IntoResponse {
    Json(PermissionResponse {
        speech_recognition: state.controller.check_permissions(),
    })
}

/// POST /speech/permissions
pub async fn request_permissions(State(state): State<AppState>) -> impl IntoResponse {
    Json(PermissionResponse {
        speech_recognition: state.controller.request_permissions().await,
    })
}

/// GET /speech/events
/// Server-sent `listeningState` and `partialResults` events
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.events.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let sse = Event::default().event(event.name()).json_data(event.payload());
                    return Some((sse, rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event listener lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
