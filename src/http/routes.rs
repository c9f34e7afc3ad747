use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/speech/start", post(handlers::start))
        .route("/speech/stop", post(handlers::stop))
        // Queries
        .route("/speech/available", get(handlers::available))
        .route("/speech/listening", get(handlers::is_listening))
        .route("/speech/languages", get(handlers::supported_languages))
        .route(
            "/speech/permissions",
            get(handlers::check_permissions).post(handlers::request_permissions),
        )
        // Listener channel
        .route("/speech/events", get(handlers::events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
