use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

/// Adds a Content-Security-Policy header to every response
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' 'unsafe-inline'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             frame-src https://www.youtube.com; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .merge(page_routes(app_state.clone()))
        .nest("/api/auth", auth_routes(app_state.clone()))
        .nest(
            "/api/admin",
            admin_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/api/practicant",
            practicant_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(middlewares::metrics::metrics_middleware))
        .layer(middleware::from_fn(middlewares::trace::trace_context_middleware))
        .layer(TraceLayer::new_for_http())
}

fn page_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin_page = Router::new()
        .route("/admin/dashboard", get(handlers::pages::admin_dashboard_page))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::admin_page_guard,
        ));

    let practicant_page = Router::new()
        .route(
            "/practicant/dashboard",
            get(handlers::pages::practicant_dashboard_page),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::practicant_page_guard,
        ));

    Router::new()
        .route("/", get(handlers::pages::root))
        .route("/login", get(handlers::pages::login_page))
        .merge(admin_page)
        .merge(practicant_page)
}

fn auth_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/register", post(handlers::auth::register));

    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        .route("/logout", post(handlers::auth::logout))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(handlers::admin::admin_dashboard))
        // Administrators
        .route(
            "/administrators",
            get(handlers::admin::list_administrators).post(handlers::admin::create_administrator),
        )
        .route(
            "/administrators/{id}",
            put(handlers::admin::update_administrator).delete(handlers::admin::delete_administrator),
        )
        // Practicants
        .route("/practicants", get(handlers::admin::list_practicants))
        .route(
            "/practicants/{id}",
            put(handlers::admin::update_practicant).delete(handlers::admin::delete_practicant),
        )
        // Content
        .route(
            "/topics",
            get(handlers::admin::list_topics).post(handlers::admin::create_topic),
        )
        .route(
            "/topics/{id}",
            get(handlers::admin::get_topic_form).put(handlers::admin::update_topic),
        )
        .route(
            "/exercises",
            get(handlers::admin::list_exercises).post(handlers::admin::create_exercise),
        )
        .route(
            "/exercises/{id}",
            get(handlers::admin::get_exercise)
                .put(handlers::admin::update_exercise)
                .delete(handlers::admin::delete_exercise),
        )
        // Session time
        .route("/session-timer", post(handlers::admin::start_session_timer))
        .route(
            "/session-timer/{timer_id}",
            get(handlers::admin::get_session_timer).delete(handlers::admin::stop_session_timer),
        )
        .route_layer(middleware::from_fn(
            middlewares::auth::admin_guard_middleware,
        ))
}

fn practicant_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(handlers::practicant::practicant_dashboard))
        .route("/topics/{topic_id}", get(handlers::practicant::topic_detail))
        .route(
            "/topics/{topic_id}/progress",
            get(handlers::practicant::topic_progress),
        )
        .route(
            "/topics/{topic_id}/exercises/{exercise_id}/submit",
            post(handlers::practicant::submit_exercise),
        )
        .route(
            "/exercises/{exercise_id}/state",
            get(handlers::practicant::exercise_state),
        )
        .route("/profile", put(handlers::practicant::update_profile))
        .route_layer(middleware::from_fn(
            middlewares::auth::practicant_guard_middleware,
        ))
}
