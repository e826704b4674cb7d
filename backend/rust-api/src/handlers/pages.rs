//! Page routes. Unauthenticated or wrong-role callers are sent to `/login`
//! by the page guards; the pages themselves are thin shells over the JSON API.

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::{
    middlewares::auth::current_session, models::auth::AuthSession, services::AppState,
};

pub async fn root() -> Redirect {
    Redirect::to("/login")
}

/// GET /login: a signed-in caller goes straight to its dashboard.
pub async fn login_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    match current_session(&state, &headers).await {
        Some(session) => Redirect::to(session.role.dashboard_path()).into_response(),
        None => Html(shell("Sign in", "login", "")).into_response(),
    }
}

pub async fn admin_dashboard_page(Extension(session): Extension<AuthSession>) -> Html<String> {
    Html(shell("Administrator dashboard", "admin-dashboard", &session.user.name))
}

pub async fn practicant_dashboard_page(
    Extension(session): Extension<AuthSession>,
) -> Html<String> {
    Html(shell("My topics", "practicant-dashboard", &session.user.name))
}

fn shell(title: &str, view: &str, user: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"es\">\n<head><meta charset=\"utf-8\"><title>StartDev | {title}</title></head>\n<body data-view=\"{view}\" data-user=\"{user}\"><div id=\"app\"></div></body>\n</html>\n",
        title = title,
        view = view,
        user = escape(user),
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_escapes_user_name() {
        let page = shell("My topics", "practicant-dashboard", "<Ana \"A\">");
        assert!(page.contains("data-user=\"&lt;Ana &quot;A&quot;&gt;\""));
        assert!(page.contains("data-view=\"practicant-dashboard\""));
    }
}
