use axum::{
    extract::{Extension, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::ApiError,
    models::auth::AuthSession,
    models::dashboard::AdminDashboard,
    services::{dashboard_service::DashboardService, AppState},
};

/// GET /api/admin/dashboard
pub async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<AdminDashboard>, ApiError> {
    let dashboard = DashboardService::new(state.strapi.clone())
        .admin(&session.user.email)
        .await
        .map_err(ApiError::backend("Error loading dashboard data"))?;
    Ok(Json(dashboard))
}
