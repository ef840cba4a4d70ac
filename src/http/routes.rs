use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/voice/sessions", post(handlers::open_session))
        .route("/voice/sessions/:session_id", get(handlers::get_session))
        .route(
            "/voice/sessions/:session_id/cancel",
            post(handlers::cancel_session),
        )
        // Manual fallbacks (intent-equivalent to voice events)
        .route(
            "/voice/sessions/:session_id/select",
            post(handlers::select_item),
        )
        .route(
            "/voice/sessions/:session_id/time",
            put(handlers::set_time_text),
        )
        .route(
            "/voice/sessions/:session_id/reserve",
            post(handlers::reserve),
        )
        .route(
            "/voice/sessions/:session_id/again",
            post(handlers::book_again),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
