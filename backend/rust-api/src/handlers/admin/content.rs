//! Topic and exercise management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::AppJson,
    models::exercise::{ExerciseForm, ExerciseView},
    models::topic::{TopicForm, TopicFormView, TopicSummary},
    services::{
        exercise_service::ExerciseService,
        topic_service::{TopicSaved, TopicService},
        AppState,
    },
};

/// GET /api/admin/topics
pub async fn list_topics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TopicSummary>>, ApiError> {
    let topics = TopicService::new(state.strapi.clone())
        .list()
        .await
        .map_err(ApiError::backend("Error loading topics"))?;
    Ok(Json(topics))
}

/// POST /api/admin/topics
pub async fn create_topic(
    State(state): State<Arc<AppState>>,
    AppJson(form): AppJson<TopicForm>,
) -> Result<impl IntoResponse, ApiError> {
    form.validate()?;

    let created = TopicService::new(state.strapi.clone())
        .create(form)
        .await
        .map_err(ApiError::backend_surfaced("Error creating topic"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/admin/topics/{id}: edit form, by numeric id or documentId
pub async fn get_topic_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TopicFormView>, ApiError> {
    let form = TopicService::new(state.strapi.clone())
        .load_form(&id)
        .await
        .map_err(ApiError::backend("Error loading topic"))?;
    Ok(Json(form))
}

/// PUT /api/admin/topics/{id}
pub async fn update_topic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(form): AppJson<TopicForm>,
) -> Result<Json<TopicSaved>, ApiError> {
    form.validate()?;

    let updated = TopicService::new(state.strapi.clone())
        .update(&id, form)
        .await
        .map_err(ApiError::backend_surfaced("Error updating topic"))?;
    Ok(Json(updated))
}

/// GET /api/admin/exercises
pub async fn list_exercises(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ExerciseView>>, ApiError> {
    let exercises = ExerciseService::new(state.strapi.clone())
        .list()
        .await
        .map_err(ApiError::backend("Error loading exercises"))?;
    Ok(Json(exercises))
}

/// GET /api/admin/exercises/{id}
pub async fn get_exercise(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ExerciseView>, ApiError> {
    let exercise = ExerciseService::new(state.strapi.clone())
        .get(&id)
        .await
        .map_err(ApiError::backend("Error loading exercise"))?;
    Ok(Json(exercise))
}

/// POST /api/admin/exercises
pub async fn create_exercise(
    State(state): State<Arc<AppState>>,
    AppJson(form): AppJson<ExerciseForm>,
) -> Result<impl IntoResponse, ApiError> {
    form.validate()?;

    let created = ExerciseService::new(state.strapi.clone())
        .create(form)
        .await
        .map_err(ApiError::backend_surfaced("Error creating exercise"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/admin/exercises/{id}
pub async fn update_exercise(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(form): AppJson<ExerciseForm>,
) -> Result<Json<ExerciseView>, ApiError> {
    form.validate()?;

    let updated = ExerciseService::new(state.strapi.clone())
        .update(&id, form)
        .await
        .map_err(ApiError::backend_surfaced("Error updating exercise"))?;
    Ok(Json(updated))
}

/// DELETE /api/admin/exercises/{id}
pub async fn delete_exercise(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ExerciseService::new(state.strapi.clone())
        .delete(&id)
        .await
        .map_err(ApiError::backend("Error deleting exercise"))?;
    Ok(StatusCode::NO_CONTENT)
}
