use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::auth::AuthSession;
use crate::models::role::Role;
use crate::services::AppState;

/// Cookie carrying the session token for page requests
pub const SESSION_COOKIE: &str = "startdev_session";

/// Bearer token, else the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

pub async fn current_session(state: &AppState, headers: &HeaderMap) -> Option<AuthSession> {
    let token = session_token(headers)?;
    state.sessions.get(&token).await
}

/// Resolves the session and stores it in request extensions; 401 otherwise.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = current_session(&state, &headers).await.ok_or_else(|| {
        tracing::warn!("Rejected {} {}: no session", request.method(), request.uri().path());
        ApiError::Unauthorized("Authentication required".to_string())
    })?;

    tracing::debug!(
        "Authenticated {} ({})",
        session.user.email,
        session.role
    );

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

fn role_allows(required: Role, actual: Role) -> bool {
    match (required, actual) {
        (Role::Administrator, Role::Administrator) | (Role::Practicant, Role::Practicant) => true,
        (Role::Administrator, Role::Practicant) | (Role::Practicant, Role::Administrator) => false,
    }
}

async fn role_guard(required: Role, request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<AuthSession>() {
        Some(session) if role_allows(required, session.role) => Ok(next.run(request).await),
        Some(session) => {
            tracing::warn!(
                "Access denied for {}: {} role required",
                session.user.email,
                required
            );
            Err(ApiError::Forbidden(format!("{} role required", required)))
        }
        None => Err(ApiError::Unauthorized("Authentication required".to_string())),
    }
}

pub async fn admin_guard_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    role_guard(Role::Administrator, request, next).await
}

pub async fn practicant_guard_middleware(
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    role_guard(Role::Practicant, request, next).await
}

async fn page_guard(
    required: Role,
    state: &AppState,
    headers: &HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    match current_session(state, headers).await {
        Some(session) if role_allows(required, session.role) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        _ => Redirect::to("/login").into_response(),
    }
}

/// Pages redirect to `/login` instead of answering 401/403.
pub async fn admin_page_guard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    page_guard(Role::Administrator, &state, &headers, request, next).await
}

pub async fn practicant_page_guard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    page_guard(Role::Practicant, &state, &headers, request, next).await
}
