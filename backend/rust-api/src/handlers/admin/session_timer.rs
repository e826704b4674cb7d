use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::auth::AuthSession,
    models::session_admin::TimerSnapshot,
    services::AppState,
};

/// POST /api/admin/session-timer: starts (or resumes) the caller's timer
pub async fn start_session_timer(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .timers
        .start(session.user.id)
        .await
        .map_err(ApiError::backend("Error starting session timer"))?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /api/admin/session-timer/{timer_id}: also the dashboard's heartbeat
pub async fn get_session_timer(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(timer_id): Path<Uuid>,
) -> Result<Json<TimerSnapshot>, ApiError> {
    state
        .timers
        .poll(timer_id, session.user.id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Session timer not found"))
}

/// DELETE /api/admin/session-timer/{timer_id}: final write, then stop
pub async fn stop_session_timer(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(timer_id): Path<Uuid>,
) -> Result<Json<TimerSnapshot>, ApiError> {
    let owned = state
        .timers
        .get(timer_id)
        .is_some_and(|snapshot| snapshot.administrator_id == session.user.id);
    if !owned {
        return Err(ApiError::not_found("Session timer not found"));
    }

    state
        .timers
        .stop(timer_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Session timer not found"))
}
