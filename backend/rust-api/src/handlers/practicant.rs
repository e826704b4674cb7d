use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::AppJson,
    models::auth::AuthSession,
    models::dashboard::{PracticantDashboard, TopicDetail},
    models::practicant::UpdateProfileRequest,
    models::submission::{ExerciseStateView, SubmissionResponse, SubmitCodeRequest},
    services::{
        dashboard_service::DashboardService,
        practicant_service::PracticantService,
        progress_service::ProgressKey,
        submission_service::SubmissionService,
        topic_service::TopicService,
        AppState,
    },
};

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub topic_id: String,
    pub progress: u8,
    /// Increments waiting to be applied after an earlier failure
    pub pending_increments: u32,
}

/// GET /api/practicant/dashboard
pub async fn practicant_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<PracticantDashboard>, ApiError> {
    let topics = TopicService::new(state.strapi.clone());
    let dashboard = DashboardService::new(state.strapi.clone())
        .practicant(&session.user, &topics)
        .await
        .map_err(ApiError::backend("Error loading topics"))?;
    Ok(Json(dashboard))
}

/// GET /api/practicant/topics/{topic_id}
pub async fn topic_detail(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(topic_id): Path<String>,
) -> Result<Json<TopicDetail>, ApiError> {
    let topics = TopicService::new(state.strapi.clone());
    let detail = DashboardService::new(state.strapi.clone())
        .topic_detail(&session.user, &topic_id, &topics, &state.progress)
        .await
        .map_err(ApiError::backend("Error loading topic"))?;
    Ok(Json(detail))
}

/// POST /api/practicant/topics/{topic_id}/exercises/{exercise_id}/submit
pub async fn submit_exercise(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path((topic_id, exercise_id)): Path<(String, String)>,
    AppJson(req): AppJson<SubmitCodeRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let response = SubmissionService::new(&state)
        .submit(&session.user, &topic_id, &exercise_id, &req.code)
        .await?;
    Ok(Json(response))
}

/// GET /api/practicant/exercises/{exercise_id}/state
pub async fn exercise_state(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(exercise_id): Path<String>,
) -> Result<Json<ExerciseStateView>, ApiError> {
    let view = SubmissionService::new(&state)
        .state(&session.user, &exercise_id)
        .await
        .map_err(ApiError::backend("Error loading exercise"))?;
    Ok(Json(view))
}

/// GET /api/practicant/topics/{topic_id}/progress
pub async fn topic_progress(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Path(topic_id): Path<String>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let topic = TopicService::new(state.strapi.clone())
        .detail(&topic_id)
        .await
        .map_err(ApiError::backend("Error loading topic"))?;
    let row = state
        .progress
        .bootstrap(&session.user.document_id, &topic.document_id, topic.exercises.len())
        .await
        .map_err(ApiError::backend("Error loading progress"))?;

    let key = ProgressKey::new(&session.user.document_id, &topic.document_id);
    Ok(Json(ProgressResponse {
        topic_id: topic.document_id,
        progress: row.progress,
        pending_increments: state.progress.outbox().pending(&key),
    }))
}

/// PUT /api/practicant/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    req.validate()?;

    PracticantService::new(state.strapi.clone())
        .update_profile(&session.user.document_id, req)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Profile updated successfully" })))
}
