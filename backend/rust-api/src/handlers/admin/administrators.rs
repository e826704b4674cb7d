use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use super::PanelQuery;
use crate::{
    error::ApiError,
    extractors::AppJson,
    models::administrator::{
        AdministratorRow, CreateAdministratorRequest, UpdateAdministratorRequest,
    },
    services::{administrator_service::AdministratorService, AppState},
};

/// GET /api/admin/administrators
pub async fn list_administrators(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PanelQuery>,
) -> Result<Json<Vec<AdministratorRow>>, ApiError> {
    let service = AdministratorService::new(state.strapi.clone());
    let rows = service
        .list(query.search.as_deref(), query.reveal_passwords)
        .await
        .map_err(ApiError::backend("Error loading administrators"))?;
    Ok(Json(rows))
}

/// POST /api/admin/administrators
pub async fn create_administrator(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateAdministratorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let service = AdministratorService::new(state.strapi.clone());
    let created = service
        .create(req)
        .await
        .map_err(ApiError::backend_surfaced("Error registering administrator"))?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/admin/administrators/{id}
pub async fn update_administrator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateAdministratorRequest>,
) -> Result<Json<AdministratorRow>, ApiError> {
    req.validate()?;

    let service = AdministratorService::new(state.strapi.clone());
    let updated = service
        .update(&id, req)
        .await
        .map_err(ApiError::backend("Error updating administrator"))?;
    Ok(Json(updated))
}

/// DELETE /api/admin/administrators/{id}: the remaining rows
pub async fn delete_administrator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AdministratorRow>>, ApiError> {
    let service = AdministratorService::new(state.strapi.clone());
    let remaining = service
        .delete(&id)
        .await
        .map_err(ApiError::backend("Error deleting administrator"))?;
    Ok(Json(remaining))
}
