use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use validator::Validate;

use super::PanelQuery;
use crate::{
    error::ApiError,
    extractors::AppJson,
    models::practicant::{PracticantRow, UpdatePracticantRequest},
    services::{practicant_service::PracticantService, AppState},
};

/// GET /api/admin/practicants
pub async fn list_practicants(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PanelQuery>,
) -> Result<Json<Vec<PracticantRow>>, ApiError> {
    let service = PracticantService::new(state.strapi.clone());
    let rows = service
        .list(query.search.as_deref(), query.reveal_passwords)
        .await
        .map_err(ApiError::backend("Error loading practicants"))?;
    Ok(Json(rows))
}

/// PUT /api/admin/practicants/{id}
pub async fn update_practicant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdatePracticantRequest>,
) -> Result<Json<PracticantRow>, ApiError> {
    req.validate()?;

    let service = PracticantService::new(state.strapi.clone());
    let updated = service
        .update(&id, req)
        .await
        .map_err(ApiError::backend("Error updating practicant"))?;
    Ok(Json(updated))
}

/// DELETE /api/admin/practicants/{id}
pub async fn delete_practicant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PracticantRow>>, ApiError> {
    let service = PracticantService::new(state.strapi.clone());
    let remaining = service
        .delete(&id)
        .await
        .map_err(ApiError::backend("Error deleting practicant"))?;
    Ok(Json(remaining))
}
