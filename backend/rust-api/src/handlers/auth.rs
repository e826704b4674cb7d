use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::AppJson,
    middlewares::auth::SESSION_COOKIE,
    models::auth::{AuthSession, LoginRequest, LoginResponse},
    models::practicant::{PracticantProfile, RegisterPracticantRequest},
    models::role::Role,
    services::{
        auth_service::{AuthError, AuthService},
        AppState,
    },
};

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = AuthService::new(state.strapi.clone())
        .login(&req)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials => ApiError::Unauthorized(e.to_string()),
            AuthError::RoleNotAuthorized => ApiError::Forbidden(e.to_string()),
        })?;

    state.sessions.insert(session.clone()).await?;

    let jar = jar.add(session_cookie(session.token.clone()));
    let body = LoginResponse {
        redirect_to: session.role.dashboard_path(),
        token: session.token,
        role: session.role,
        user: session.user,
    };
    Ok((jar, Json(body)))
}

/// POST /api/auth/register: practicant self-registration, no sign-in
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterPracticantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let created = AuthService::new(state.strapi.clone())
        .register(req)
        .await
        .map_err(ApiError::backend_surfaced("Error registering user"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. You can now sign in.",
            "practicant": PracticantProfile::from(created),
        })),
    ))
}

/// POST /api/auth/logout: drops the session and stops the caller's
/// admin timers
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, ApiError> {
    match session.role {
        Role::Administrator => {
            let stopped = state.timers.stop_all_for(session.user.id).await;
            if !stopped.is_empty() {
                tracing::info!(
                    "Stopped {} session timer(s) of administrator {}",
                    stopped.len(),
                    session.user.id
                );
            }
        }
        Role::Practicant => {}
    }

    state.sessions.remove(&session.token).await?;
    tracing::info!("{} signed out", session.user.email);

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((StatusCode::NO_CONTENT, jar))
}

/// GET /api/auth/me
pub async fn me(Extension(session): Extension<AuthSession>) -> Json<AuthSession> {
    Json(session)
}
