use super::state::AppState;
use crate::booking::{BookingSession, SessionSnapshot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    /// Who is booking
    pub user_id: i64,

    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,

    /// What the user should say in the current phase
    pub prompt: &'static str,
}

impl From<SessionSnapshot> for SessionView {
    fn from(snapshot: SessionSnapshot) -> Self {
        let prompt = snapshot.prompt();
        Self { snapshot, prompt }
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    /// Zero-based list index; equivalent to the ordinal index + 1
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct TimeTextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /voice/sessions
/// Open a new voice-booking session and start listening
pub async fn open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("voice-{}", uuid::Uuid::new_v4()));

    info!("Opening voice session: {}", session_id);

    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&session_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Session {} is already open", session_id),
                }),
            )
                .into_response();
        }
    }

    // Each session owns its recognizer instance exclusively
    let recognizer = match state.recognizers.create() {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to create recognizer: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to create recognizer: {}", e),
                }),
            )
                .into_response();
        }
    };

    let session = Arc::new(BookingSession::open(
        session_id.clone(),
        req.user_id,
        state.voice.clone(),
        recognizer,
        Arc::clone(&state.gateway),
        Arc::clone(&state.speaker),
    ));

    let snapshot = session.snapshot().await;

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id, session);
    }

    (StatusCode::CREATED, Json(SessionView::from(snapshot))).into_response()
}

/// GET /voice/sessions/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match lookup(&state, &session_id).await {
        Some(session) => Json(SessionView::from(session.snapshot().await)).into_response(),
        None => not_found(&session_id),
    }
}

/// POST /voice/sessions/:session_id/select
/// Tap on list item N, equivalent to the Choice phase hearing "N+1번째"
pub async fn select_item(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SelectRequest>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id);
    };

    if let Err(e) = session.select(req.index).await {
        return gone(&session_id, e);
    }
    StatusCode::ACCEPTED.into_response()
}

/// PUT /voice/sessions/:session_id/time
/// Type-in replacement for the reservation-time hint
pub async fn set_time_text(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<TimeTextRequest>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id);
    };

    if let Err(e) = session.set_time_text(req.text).await {
        return gone(&session_id, e);
    }
    StatusCode::ACCEPTED.into_response()
}

/// POST /voice/sessions/:session_id/reserve
/// Confirm the current time hint, equivalent to Time-phase silence
pub async fn reserve(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id);
    };

    if let Err(e) = session.reserve().await {
        return gone(&session_id, e);
    }
    StatusCode::ACCEPTED.into_response()
}

/// POST /voice/sessions/:session_id/again
/// Reopen the flow after a completed reservation
pub async fn book_again(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &session_id).await else {
        return not_found(&session_id);
    };

    if let Err(e) = session.book_again().await {
        return gone(&session_id, e);
    }
    StatusCode::ACCEPTED.into_response()
}

/// POST /voice/sessions/:session_id/cancel
/// Stop recognition, clear timers, close the session
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id)
    };

    match session {
        Some(session) => {
            info!("Cancelling voice session: {}", session_id);
            session.cancel().await;
            Json(SessionView::from(session.snapshot().await)).into_response()
        }
        None => not_found(&session_id),
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn lookup(state: &AppState, session_id: &str) -> Option<Arc<BookingSession>> {
    let sessions = state.sessions.read().await;
    sessions.get(session_id).cloned()
}

fn not_found(session_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session {} not found", session_id),
        }),
    )
        .into_response()
}

fn gone(session_id: &str, e: anyhow::Error) -> axum::response::Response {
    (
        StatusCode::GONE,
        Json(ErrorResponse {
            error: format!("Session {} is closed: {}", session_id, e),
        }),
    )
        .into_response()
}
